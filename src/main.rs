use gee::{handler, middleware, Engine, Field, FieldKind, FormSchema};
use http::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Define an app state to share it across the route handlers and middlewares.
struct State {
    greeting: &'static str,
}

#[derive(Deserialize)]
struct Login {
    username: String,
    remember: Option<bool>,
}

impl FormSchema for Login {
    fn fields() -> Vec<Field> {
        vec![
            Field::required("username", FieldKind::Str),
            Field::optional("remember", FieldKind::Bool),
        ]
    }
}

fn app() -> Engine {
    let mut app = Engine::builder()
        .graceful_shutdown(true)
        .shutdown_timeout(Duration::from_secs(5))
        .data(State { greeting: "Hello" })
        .build();

    app.get(
        "/",
        [handler(|c| Box::pin(async move { c.html(StatusCode::OK, "<h1>Hello Gee</h1>") }))],
    );

    app.get(
        "/hello/:name",
        [handler(|c| {
            Box::pin(async move {
                let greeting = c.data::<State>().map(|s| s.greeting).unwrap_or("Hi");
                let name = c.param("name").unwrap_or_default().to_owned();
                c.string(StatusCode::OK, format!("{} {}, you're at {}\n", greeting, name, c.path()));
            })
        })],
    );

    app.get(
        "/assets/*filepath",
        [handler(|c| {
            Box::pin(async move {
                let file = c.param("filepath").unwrap_or_default().to_owned();
                c.json(StatusCode::OK, &serde_json::json!({ "filepath": file }));
            })
        })],
    );

    app.get(
        "/panic",
        [handler(|c| {
            Box::pin(async move {
                let names = ["geektutu"];
                let idx = c.query("idx").and_then(|v| v.parse::<usize>().ok()).unwrap_or(100);
                c.string(StatusCode::OK, names[idx]);
            })
        })],
    );

    let mut v2 = app.group("/v2");
    v2.middleware([middleware::logger()]);
    v2.post(
        "/login",
        [handler(|c| {
            Box::pin(async move {
                match c.bind_form::<Login>() {
                    Ok(login) => c.json(
                        StatusCode::OK,
                        &serde_json::json!({
                            "username": login.username,
                            "remember": login.remember.unwrap_or(false),
                        }),
                    ),
                    Err(err) => c.abort_with_json(StatusCode::BAD_REQUEST, err.to_string()),
                }
            })
        })],
    );
    v2.static_files("/static", "./static");

    app
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "gee=debug,info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = app().run("127.0.0.1:9999").await {
        tracing::error!("server error: {}", err);
        std::process::exit(1);
    }
}
