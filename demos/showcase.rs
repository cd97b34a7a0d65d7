//! Two controllers, one of them the application default and one wrapped by an
//! interceptor, dispatched from raw URIs.

use mmg_dispatch::config::DispatchConfig;
use mmg_dispatch::prelude::*;
use mmg_dispatch::view::BodyRenderer;

#[mmg_dispatch::controller("home", default)]
#[derive(Default)]
struct Home;

#[mmg_dispatch::controller]
impl Home {
    #[mmg_dispatch::default_action]
    fn index(&self) -> View {
        View::html("<h1>welcome</h1>")
    }
}

#[mmg_dispatch::interceptor]
#[derive(Default)]
struct AccessLog;

#[mmg_dispatch::interceptor]
impl AccessLog {
    #[mmg_dispatch::before_action]
    fn enter(&self, ctx: &RequestContext) {
        tracing::info!(verb = %ctx.request().method, action = ?ctx.resolved_action(), "request in");
    }

    #[mmg_dispatch::after_action]
    fn leave(&self, ctx: &RequestContext) {
        tracing::info!(status = ?ctx.result().map(|v| v.status), "request out");
    }
}

#[derive(serde::Serialize)]
struct Forgotten {
    forgotten: bool,
}

#[mmg_dispatch::controller("greet", interceptors(AccessLog))]
#[derive(Default)]
struct Greeter {
    visits: u32,
}

#[mmg_dispatch::controller]
impl Greeter {
    #[mmg_dispatch::init]
    fn init(&mut self) {
        self.visits = 1;
    }

    #[mmg_dispatch::before_action]
    fn reject_anonymous(&self, name: Option<String>) -> Option<View> {
        match name {
            Some(_) => None,
            None => Some(View::error(400, "who are you?")),
        }
    }

    #[mmg_dispatch::action]
    async fn hello(&self, name: Option<String>) -> View {
        View::text(format!("hello {}, visit #{}", name.unwrap_or_default(), self.visits))
    }

    #[mmg_dispatch::action(verbs(DELETE))]
    fn forget(&self, ctx: &RequestContext) -> anyhow::Result<View> {
        tracing::info!(action = ?ctx.resolved_action(), "forgetting");
        View::json_of(&Forgotten { forgotten: true })
    }

    #[mmg_dispatch::after_action]
    fn stamp(&self, ctx: &RequestContext) -> Option<View> {
        ctx.result()
            .and_then(View::as_text)
            .map(|t| View::text(format!("{t}!")))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let cfg = DispatchConfig::from_toml_str(
        r#"
        default_verbs = ["GET", "POST"]
        install_global = true
        "#,
    )?;
    let mut app = App::new(cfg.clone());
    app.start()?;
    let Some(dispatcher) = app.dispatcher() else {
        anyhow::bail!("app not started");
    };
    for (verb, uri) in [
        (Method::GET, "/"),
        (Method::GET, "/greet/hello?name=ada"),
        (Method::GET, "/greet/hello"),
        (Method::DELETE, "/greet/forget?name=ada"),
        (Method::GET, "/greet/forget?name=ada"),
        (Method::GET, "/?cntrl=greet&actn=hello&name=grace"),
    ] {
        let out = dispatcher
            .serve(Request::from_uri(verb.clone(), uri, &cfg), &BodyRenderer)
            .await;
        println!("{verb} {uri} -> {} {}", out.status, String::from_utf8_lossy(&out.body));
    }
    app.stop();
    Ok(())
}
