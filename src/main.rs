use glint::{H, app, handler_fn};
use log::info;
use serde::Serialize;
use serde_json::json;
use std::time::Instant;

#[derive(Debug, Serialize)]
struct UserView<'a> {
    id: &'a str,
    profile: String,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut app = app();
    const PORT: u16 = 8080;

    app.use_handler(handler_fn(|ctx| {
        Box::pin(async move {
            let start = Instant::now();
            ctx.next().await;
            info!(
                "{} {} {} ({} µs)",
                ctx.method(),
                ctx.path(),
                ctx.status_code(),
                start.elapsed().as_micros()
            );
        })
    }));

    app.get(
        "/",
        handler_fn(|ctx| {
            Box::pin(async move {
                ctx.html(
                    200,
                    r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>glint</title></head>
<body>
    <h1>Welcome to glint</h1>
    <ul>
        <li><a href="/echo?name=Ada">Echo</a></li>
        <li><a href="/json">JSON Endpoint</a></li>
        <li><a href="/users/42">Route parameter</a></li>
        <li><a href="/admin/stats">Guarded group</a></li>
    </ul>
</body>
</html>"#,
                );
            })
        }),
    );

    app.get(
        "/echo",
        handler_fn(|ctx| {
            Box::pin(async move {
                let name = ctx.query("name").unwrap_or_default();
                ctx.string(200, name);
            })
        }),
    );

    app.get(
        "/json",
        handler_fn(|ctx| {
            Box::pin(async move {
                let mut body = H::new();
                body.insert("message".into(), json!("Hello from JSON!"));
                body.insert("status".into(), json!("success"));
                body.insert("version".into(), json!("1.0"));
                ctx.json(200, &body);
            })
        }),
    );

    app.get(
        "/users/{id}",
        handler_fn(|ctx| {
            Box::pin(async move {
                let id = ctx.param("id").unwrap_or_default().to_owned();
                let user = UserView {
                    id: &id,
                    profile: format!("/users/{id}"),
                };
                ctx.json(200, &user);
            })
        }),
    );

    app.post(
        "/login",
        handler_fn(|ctx| {
            Box::pin(async move {
                let user = ctx.post_form("username").unwrap_or("anonymous").to_owned();
                ctx.string(200, format_args!("welcome, {user}"));
            })
        }),
    );

    // Cached greeting: the first handler writes and continues, the second appends.
    app.get(
        "/hello",
        handler_fn(|ctx| {
            Box::pin(async move {
                ctx.set_header("Cache-Control", "public, max-age=86400");
                ctx.string(200, "Hello, world");
                ctx.next().await;
            })
        }),
    );
    app.get(
        "/hello",
        handler_fn(|ctx| {
            Box::pin(async move {
                ctx.write("!");
            })
        }),
    );

    let mut admin = app.group("/admin");
    admin.use_handler(handler_fn(|ctx| {
        Box::pin(async move {
            if ctx.header("Authorization") != Some("Bearer letmein") {
                ctx.error(401, "unauthorized");
                return;
            }
            ctx.next().await;
        })
    }));
    admin.get(
        "/stats",
        handler_fn(|ctx| {
            Box::pin(async move {
                ctx.json(200, &json!({ "requests": 1 }));
            })
        }),
    );

    if let Err(err) = app
        .listen(PORT, |addr| info!("Server listening on {}", addr))
        .await
    {
        log::error!("server error: {}", err);
    }
}
