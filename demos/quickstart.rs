//! A small JSON API showing routes, params, groups, and middleware.
//!
//! Run with `RUST_LOG=kami=debug cargo run --example quickstart` and try:
//!
//! ```text
//! curl localhost:8080/
//! curl localhost:8080/api/v1/users/42
//! curl localhost:8080/api/v1/files/docs/readme.md
//! curl localhost:8080/boom
//! ```

use kami::{
    Error, HandlerResult, Response, Router, Server, StatusCode,
    context::Context,
    handler::Handler,
    middleware::around,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct User<'a> {
    id: u64,
    name: &'a str,
}

async fn index(_ctx: Context) -> HandlerResult {
    Ok(Response::new(StatusCode::Ok).body("kami quickstart\n"))
}

async fn get_user(ctx: Context) -> HandlerResult {
    let id = ctx
        .param("id")
        .and_then(|raw| raw.parse::<u64>().ok())
        .ok_or_else(|| Error::bad_request("user id must be a number"))?;
    Response::json(StatusCode::Ok, &User { id, name: "ferris" })
}

async fn get_file(ctx: Context) -> HandlerResult {
    let path = ctx.param("path").unwrap_or_default();
    Ok(Response::new(StatusCode::Ok).body(format!("you asked for {path:?}\n")))
}

async fn not_found(ctx: Context) -> HandlerResult {
    Err(Error::not_found(format!("no route for {}", ctx.request().path())))
}

async fn boom(_ctx: Context) -> HandlerResult {
    panic!("this handler always panics");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let server_header = around(|ctx: Context, next: Handler| async move {
        let res = next(ctx).await?;
        Ok(res.header("Server", "kami"))
    });

    let mut router = Router::builder()
        .logger()
        .middleware(server_header)
        .not_found(not_found)
        .build();

    router.get("/", index)?;
    router.get("/boom", boom)?;
    {
        let mut v1 = router.group("/api/v1")?;
        v1.get("/users/:id", get_user)?;
        v1.get("/files/*path", get_file)?;
    }

    Server::bind("127.0.0.1:8080").await?.serve(router).await?;
    Ok(())
}
