use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct ControllerConfig {
    /// Requeue interval while a DocServer is not yet Healthy.
    /// Env: DOCSERVER_REQUEUE_SECS
    #[envconfig(from = "DOCSERVER_REQUEUE_SECS", default = "5")]
    pub requeue_secs: u64,

    /// Backoff after a failed reconcile attempt.
    /// Env: DOCSERVER_ERROR_REQUEUE_SECS
    #[envconfig(from = "DOCSERVER_ERROR_REQUEUE_SECS", default = "60")]
    pub error_requeue_secs: u64,

    /// Restrict watches to one namespace; unset or empty watches all.
    #[envconfig(from = "DOCSERVER_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    #[envconfig(from = "DOCSERVER_EVENTS_ENABLED", default = "true")]
    pub events_enabled: bool,

    #[envconfig(nested)]
    pub http: HttpConfig,
}

#[derive(Envconfig, Clone, Debug)]
pub struct HttpConfig {
    #[envconfig(from = "HTTP_PORT", default = "8088")]
    pub port: u16,

    /// Serve the validating admission endpoint next to the health routes.
    /// Env: DOCSERVER_WEBHOOK_ENABLED
    #[envconfig(from = "DOCSERVER_WEBHOOK_ENABLED", default = "false")]
    pub webhook_enabled: bool,
}

impl ControllerConfig {
    pub fn namespace_scope(&self) -> Option<&str> {
        self.watch_namespace.as_deref().filter(|ns| !ns.is_empty())
    }
}
