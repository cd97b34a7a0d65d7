use mmg_dispatch::config::DispatchConfig;
use mmg_dispatch::controller::ControllerClass;
use mmg_dispatch::prelude::*;

#[mmg_dispatch::controller("items")]
#[derive(Default)]
struct Items;

#[mmg_dispatch::controller]
impl Items {
    #[mmg_dispatch::action]
    fn list(&self) -> View {
        View::text("list")
    }

    #[mmg_dispatch::action(verbs(POST, PUT))]
    fn save(&self, name: String) -> anyhow::Result<View> {
        anyhow::ensure!(!name.is_empty(), "empty name");
        Ok(View::text(format!("saved {name}")))
    }
}

fn app(cfg: DispatchConfig) -> (App, Dispatcher) {
    let mut app = App::new(cfg);
    app.controllers(vec![ControllerClass::of::<Items>()]);
    app.start().unwrap();
    let d = app.dispatcher().unwrap();
    (app, d)
}

#[tokio::test(flavor = "multi_thread")]
async fn default_verbs_come_from_config() {
    let cfg = DispatchConfig::from_toml_str(r#"default_verbs = ["get"]"#).unwrap();
    let (_app, d) = app(cfg);
    let get = d.dispatch(Request::get("items").action("list")).await;
    assert_eq!(get.as_text(), Some("list"));
    let post = d
        .dispatch(Request::new(Method::POST).route("items").action("list"))
        .await;
    assert_eq!(post.status, 405);
    // an explicit restriction is independent of the defaults
    let put = d
        .dispatch(Request::new(Method::PUT).route("items").action("save").param("name", "x"))
        .await;
    assert_eq!(put.as_text(), Some("saved x"));
}

#[tokio::test(flavor = "multi_thread")]
async fn route_and_action_params_are_configurable() {
    let cfg = DispatchConfig::from_toml_str(
        r#"
        route_param = "c"
        action_param = "a"
        "#,
    )
    .unwrap();
    let (_app, d) = app(cfg.clone());
    let req = Request::from_uri(Method::POST, "?c=items&a=save&name=caf%C3%A9+au+lait", &cfg);
    let v = d.dispatch(req).await;
    assert_eq!(v.as_text(), Some("saved café au lait"));
}

#[tokio::test(flavor = "multi_thread")]
async fn handler_errors_become_500() {
    let cfg = DispatchConfig::default();
    let (_app, d) = app(cfg);
    let v = d
        .dispatch(Request::new(Method::POST).route("items").action("save").param("name", ""))
        .await;
    assert_eq!(v.status, 500);
}
