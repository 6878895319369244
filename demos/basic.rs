use ash_rpc_router::sanitization::MaskInternalErrors;
use ash_rpc_router::*;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Shared application state handed to every call
#[derive(Clone)]
struct AppContext {
    user: String,
    calls: Arc<AtomicU64>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let router = Router::builder()
        .method("add", |params: Value, _ctx: AppContext| async move {
            let a = params["a"]
                .as_i64()
                .ok_or_else(|| rpc_invalid_params!("'a' must be an integer"))?;
            let b = params["b"]
                .as_i64()
                .ok_or_else(|| rpc_invalid_params!("'b' must be an integer"))?;
            Ok(json!(a + b))
        })
        .method("whoami", |_params: Value, ctx: AppContext| async move {
            Ok(json!({"user": ctx.user}))
        })
        .method("log", |params: Value, _ctx: AppContext| async move {
            tracing::info!(line = %params, "client log");
            Ok(Value::Null)
        })
        .method("db", |_params: Value, _ctx: AppContext| async move {
            Err(rpc_internal_error!("connection to 10.0.0.5:5432 refused"))
        })
        .before(
            "add",
            Hook::single(|_params: Value, _result: Option<Value>, ctx: AppContext| async move {
                ctx.calls.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }),
        )
        .before(
            "whoami",
            Hook::group()
                .with(|_params: Value, _result: Option<Value>, ctx: AppContext| async move {
                    if ctx.user.is_empty() {
                        return Err(rpc_error!(401, "unauthenticated"));
                    }
                    Ok(())
                })
                .with(|_params: Value, _result: Option<Value>, ctx: AppContext| async move {
                    ctx.calls.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }),
        )
        .after(
            "add",
            Hook::single(|params: Value, result: Option<Value>, _ctx: AppContext| async move {
                tracing::info!(params = %params, result = ?result, "audit");
                Ok(())
            }),
        )
        .on_error(|error: &Error, call: &Call| {
            tracing::warn!(method = ?call.method_name(), code = error.code(), error = %error, "rpc failure");
        })
        .sanitizer(MaskInternalErrors)
        .max_batch_size(16)
        .build()?;

    let ctx = AppContext {
        user: "alice".to_string(),
        calls: Arc::new(AtomicU64::new(0)),
    };

    let bodies = [
        json!({"jsonrpc": "2.0", "method": "add", "params": {"a": 2, "b": 3}, "id": 1}),
        json!({"jsonrpc": "2.0", "method": "whoami", "id": "me"}),
        json!({"jsonrpc": "2.0", "method": "db", "id": 2}),
        json!({"jsonrpc": "1.0", "method": "add", "id": 3}),
        json!([
            {"jsonrpc": "2.0", "method": "add", "params": {"a": 1, "b": 1}, "id": 10},
            {"jsonrpc": "2.0", "method": "log", "params": {"msg": "hello"}},
            {"jsonrpc": "2.0", "method": "missing", "id": 11}
        ]),
        json!("not a request"),
    ];

    for body in bodies {
        match router.handle(body, ctx.clone()).await {
            Ok(reply) => match reply.into_value() {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => println!("(no response)"),
            },
            Err(error) => println!("rejected: {error}"),
        }
    }

    tracing::info!(calls = ctx.calls.load(Ordering::Relaxed), "hooks counted calls");
    Ok(())
}
