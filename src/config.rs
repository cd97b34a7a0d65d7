use http::Method;
use serde::{Deserialize, Deserializer};

/// Framework configuration. Only honoured before `App::start`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Verbs answered by actions that declare no verb restriction.
    #[serde(deserialize_with = "de_verbs")]
    pub default_verbs: Vec<Method>,
    /// Query parameter carrying the route variable when the path has none.
    pub route_param: String,
    /// Query parameter carrying the action name when the path has none.
    pub action_param: String,
    /// Also publish the registry into the process-wide slot on start.
    pub install_global: bool,
}

pub const DEFAULT_ROUTE_PARAM: &str = "cntrl";
pub const DEFAULT_ACTION_PARAM: &str = "actn";

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_verbs: vec![Method::GET, Method::POST],
            route_param: DEFAULT_ROUTE_PARAM.to_string(),
            action_param: DEFAULT_ACTION_PARAM.to_string(),
            install_global: false,
        }
    }
}

impl DispatchConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

fn de_verbs<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Method>, D::Error> {
    let raw = Vec::<String>::deserialize(d)?;
    raw.iter()
        .map(|v| {
            Method::from_bytes(v.trim().to_ascii_uppercase().as_bytes())
                .map_err(|_| serde::de::Error::custom(format!("invalid HTTP verb `{v}`")))
        })
        .collect()
}
