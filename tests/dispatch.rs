//! End-to-end routing through the public API: register, look up, dispatch.

use std::{
    fs,
    sync::{Arc, Mutex},
};

use kami::{
    Error, Handler, HandlerResult, Method, Params, Request, Response, RouteError, Router,
    StatusCode, context::Context, middleware::around,
};

fn tagged(tag: &'static str) -> impl Fn(Context) -> std::future::Ready<HandlerResult> + Send + Sync + 'static {
    move |_ctx| std::future::ready(Ok(Response::new(StatusCode::Ok).body(tag)))
}

async fn call(router: &Router, method: Method, path: &str) -> (StatusCode, String) {
    let res = router.dispatch(Request::new(method, path)).await;
    (res.status(), res.body_text().unwrap_or_default().to_owned())
}

fn params<const N: usize>(pairs: [(&str, &str); N]) -> Params {
    pairs.into_iter().collect()
}

#[tokio::test]
async fn static_routes_do_not_cross_contaminate() {
    let mut router = Router::new();
    let routes = ["/", "/a", "/a/b", "/b", "/b/a", "/user/list", "/user/new"];
    for path in routes {
        let tag: &'static str = path;
        router.get(path, tagged(tag)).unwrap();
    }
    for path in routes {
        assert_eq!(call(&router, Method::Get, path).await, (StatusCode::Ok, path.to_owned()));
    }
}

#[tokio::test]
async fn static_beats_param_in_either_order() {
    for static_first in [true, false] {
        let mut router = Router::new();
        if static_first {
            router.get("/user/list", tagged("static")).unwrap();
            router.get("/user/:id", tagged("param")).unwrap();
        } else {
            router.get("/user/:id", tagged("param")).unwrap();
            router.get("/user/list", tagged("static")).unwrap();
        }

        assert_eq!(call(&router, Method::Get, "/user/list").await.1, "static");
        assert_eq!(call(&router, Method::Get, "/user/bob").await.1, "param");

        let (_, bound) = router.lookup(&Method::Get, "/user/bob").unwrap();
        assert_eq!(bound, params([("id", "bob")]));
    }
}

#[test]
fn extracts_multiple_params() {
    let mut router = Router::new();
    router.get("/user/:uid/post/:pid", tagged("post")).unwrap();
    let (_, bound) = router.lookup(&Method::Get, "/user/alice/post/42").unwrap();
    assert_eq!(bound, params([("uid", "alice"), ("pid", "42")]));
}

#[test]
fn wildcard_captures_remainder() {
    let mut router = Router::new();
    router.get("/static/*path", tagged("files")).unwrap();
    let (_, bound) = router.lookup(&Method::Get, "/static/js/app.js").unwrap();
    assert_eq!(bound, params([("path", "js/app.js")]));

    // an exhausted path only matches a node with its own handler
    assert!(router.lookup(&Method::Get, "/static").is_none());
}

#[tokio::test]
async fn params_arrive_decoded() {
    let mut router = Router::new();
    router
        .get("/user/:name", |ctx: Context| async move {
            let name = ctx.param("name").unwrap_or_default().to_owned();
            Ok(Response::new(StatusCode::Ok).body(name))
        })
        .unwrap();
    assert_eq!(call(&router, Method::Get, "/user/john%20doe").await.1, "john doe");
}

#[tokio::test]
async fn methods_are_isolated() {
    let mut router = Router::new();
    router.get("/thing", tagged("get")).unwrap();

    assert!(router.lookup(&Method::Post, "/thing").is_none());
    assert_eq!(call(&router, Method::Post, "/thing").await.0, StatusCode::NotFound);
    assert_eq!(router.allowed_methods("/thing"), [Method::Get]);
}

#[tokio::test]
async fn conflict_leaves_table_usable() {
    let mut router = Router::new();
    router.get("/user/:id", tagged("by id")).unwrap();
    router.get("/health", tagged("ok")).unwrap();

    let err = router.get("/user/:name", tagged("by name")).unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(
        err,
        RouteError::ParamNameConflict {
            path: "/user/:name".into(),
            existing: "id".into(),
            new: "name".into(),
        }
    );

    assert_eq!(router.len(), 2);
    assert_eq!(call(&router, Method::Get, "/health").await.1, "ok");
    assert_eq!(call(&router, Method::Get, "/user/7").await.1, "by id");
}

#[test]
fn repeated_param_name_is_rejected() {
    let mut router = Router::new();
    let err = router.get("/a/:x/b/:x", tagged("")).unwrap_err();
    assert!(matches!(err, RouteError::DuplicateParamName { ref name, .. } if name == "x"));
    assert!(router.is_empty());
}

#[tokio::test]
async fn root_is_distinct_from_empty_and_single_segment() {
    let mut router = Router::new();
    router.get("/", tagged("root")).unwrap();
    router.get("/a", tagged("a")).unwrap();

    assert_eq!(call(&router, Method::Get, "/").await.1, "root");
    assert_eq!(call(&router, Method::Get, "/a").await.1, "a");
    assert!(router.lookup(&Method::Get, "").is_none());
    assert!(router.get("", tagged("")).is_err());
}

#[test]
fn lookup_is_repeatable() {
    let mut router = Router::new();
    router.get("/files/:dir/*rest", tagged("f")).unwrap();

    let (first, first_params) = router.lookup(&Method::Get, "/files/etc/a/b").unwrap();
    for _ in 0..3 {
        let (again, again_params) = router.lookup(&Method::Get, "/files/etc/a/b").unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(first_params, again_params);
    }
    assert_eq!(router.len(), 1);
}

#[tokio::test]
async fn middleware_order_and_not_found() {
    let trail = Arc::new(Mutex::new(Vec::new()));
    let layer = |name: &'static str| {
        let trail = Arc::clone(&trail);
        around(move |ctx: Context, next: Handler| {
            let trail = Arc::clone(&trail);
            async move {
                trail.lock().unwrap().push(format!("{name}:in"));
                let res = next(ctx).await;
                trail.lock().unwrap().push(format!("{name}:out"));
                res
            }
        })
    };

    let mut router = Router::builder()
        .middleware(layer("m1"))
        .middleware(layer("m2"))
        .not_found(|_ctx: Context| async {
            Ok(Response::new(StatusCode::NotFound).body("custom 404"))
        })
        .logger()
        .build();
    router.get("/here", tagged("here")).unwrap();

    assert_eq!(call(&router, Method::Get, "/here").await.1, "here");
    assert_eq!(
        call(&router, Method::Get, "/gone").await,
        (StatusCode::NotFound, "custom 404".into())
    );
    assert_eq!(
        *trail.lock().unwrap(),
        ["m1:in", "m2:in", "m2:out", "m1:out", "m1:in", "m2:in", "m2:out", "m1:out"]
    );
}

#[tokio::test]
async fn panics_become_500_and_serving_continues() {
    async fn explode(ctx: Context) -> HandlerResult {
        panic!("cannot handle {}", ctx.request().path());
    }

    let mut router = Router::builder().logger().build();
    router.get("/explode/:n", explode).unwrap();
    router.get("/calm", tagged("calm")).unwrap();

    let (status, body) = call(&router, Method::Get, "/explode/1").await;
    assert_eq!(status, StatusCode::InternalServerError);
    assert_eq!(body, "Internal Server Error");
    assert_eq!(call(&router, Method::Get, "/calm").await.1, "calm");
}

#[tokio::test]
async fn handler_errors_render_as_problem_json() {
    let mut router = Router::new();
    router
        .get("/users/:id", |ctx: Context| async move {
            match ctx.param("id") {
                Some("1") => Ok(Response::new(StatusCode::Ok).body("one")),
                _ => Err(Error::not_found("no such user")),
            }
        })
        .unwrap();

    let res = router.dispatch(Request::new(Method::Get, "/users/2")).await;
    assert_eq!(res.status(), StatusCode::NotFound);
    assert_eq!(res.headers().get("content-type"), Some("application/problem+json"));
    assert_eq!(res.body_text(), Some(r#"{"msg":"no such user"}"#));
}

#[tokio::test]
async fn groups_share_table_and_middleware() {
    let hits = Arc::new(Mutex::new(0_usize));
    let counter = Arc::clone(&hits);
    let mut router = Router::builder()
        .middleware(move |next: Handler| -> Handler {
            *counter.lock().unwrap() += 1;
            next
        })
        .build();

    {
        let mut api = router.group("/api/").unwrap();
        api.get("/status", tagged("up")).unwrap();
        let mut admin = api.group("/admin").unwrap();
        admin.delete("/users/:id", tagged("deleted")).unwrap();
    }

    assert_eq!(call(&router, Method::Get, "/api/status").await.1, "up");
    assert_eq!(call(&router, Method::Delete, "/api/admin/users/3").await.1, "deleted");
    assert_eq!(*hits.lock().unwrap(), 2);
}

#[tokio::test]
async fn static_mount_serves_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<p>home</p>").unwrap();
    fs::create_dir(dir.path().join("css")).unwrap();
    fs::write(dir.path().join("css/site.css"), "p{}").unwrap();
    fs::write(dir.path().join("my file.txt"), "spaced").unwrap();

    let mut router = Router::new();
    router.serve_static("/assets/", dir.path()).unwrap();

    assert_eq!(
        call(&router, Method::Get, "/assets/css/site.css").await,
        (StatusCode::Ok, "p{}".into())
    );
    assert_eq!(call(&router, Method::Get, "/assets/").await.1, "<p>home</p>");
    assert_eq!(call(&router, Method::Get, "/assets").await.1, "<p>home</p>");
    assert_eq!(call(&router, Method::Get, "/assets/my%20file.txt").await.1, "spaced");
    assert_eq!(call(&router, Method::Get, "/assets/missing.js").await.0, StatusCode::NotFound);
    assert_eq!(
        call(&router, Method::Get, "/assets/../secret").await.0,
        StatusCode::NotFound
    );
}
