use crate::bot::BotManager;
use crate::config::AppConfig;
use crate::gemini::GeminiClient;
use crate::http::create_app;
use crate::line::LineClient;
use crate::TracingReloadHandle;
use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::log::{error, info, warn};

#[cfg(feature = "sentry")]
pub type SentryGuard = Option<sentry::ClientInitGuard>;

#[cfg(not(feature = "sentry"))]
pub type SentryGuard = Option<()>;

pub struct AppHandles {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    _sentry_guard: SentryGuard,
}
impl AppHandles {
    pub fn new(
        config: AppConfig,
        _tracing_reload: TracingReloadHandle,
        _sentry_guard: SentryGuard,
    ) -> Result<AppHandles> {
        let line = LineClient::new(&config.line)?;

        let gemini = GeminiClient::new(&config.gemini)?;
        match &gemini {
            Some(client) => info!("Gemini recommendations enabled with model: {}", client.model()),
            None => warn!(
                "No Gemini API key configured! Recommendation queries will get an unavailable reply."
            ),
        }

        let bot_manager = BotManager::new(line, gemini);

        let mut tasks = Vec::new();
        tasks.push((
            "HTTP Server",
            Self::start_http_server(
                config,
                bot_manager,
                _sentry_guard.is_some(),
                _tracing_reload,
            )?,
        ));

        Ok(AppHandles {
            tasks,
            _sentry_guard,
        })
    }

    pub async fn run(self) {
        let futures: Vec<_> = self
            .tasks
            .into_iter()
            .map(|(name, handle)| {
                info!("Starting task: {name}");
                Box::pin(async move {
                    match handle.await {
                        Ok(_) => error!("{name} task completed!"),
                        Err(e) => error!("{name} task failed: {e:?}!"),
                    }
                })
            })
            .collect();

        // Wait for any task to complete. All handles are boxed, so when dropped they are cancelled.
        let (_, _, remaining) = futures::future::select_all(futures).await;
        drop(remaining);
    }

    fn start_http_server(
        config: AppConfig,
        bot_manager: BotManager,
        _sentry_enabled: bool,
        _tracing_reload: TracingReloadHandle,
    ) -> Result<JoinHandle<()>> {
        let address = config.http.address;
        let tls_config = config.http.tls.clone();

        let app = create_app(
            config.http,
            config.line.channel_secret,
            bot_manager,
            _sentry_enabled,
            _tracing_reload,
        )?;
        let handle = tokio::spawn(async move {
            let result = match tls_config {
                Some(_tls_config) => {
                    #[cfg(any(feature = "tls-rustls", feature = "tls-native"))]
                    {
                        info!("Starting HTTPS (secure) server on {address}");

                        #[cfg(feature = "tls-rustls")]
                        {
                            let _ = rustls::crypto::CryptoProvider::install_default(
                                rustls::crypto::aws_lc_rs::default_provider(),
                            );
                            let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                                &_tls_config.certificate_path,
                                &_tls_config.key_path,
                            )
                            .await
                            .expect("Failed to load rustls TLS certificates!");
                            axum_server::bind_rustls(address, tls)
                                .serve(app.into_make_service())
                                .await
                                .map_err(anyhow::Error::from)
                        }

                        #[cfg(all(feature = "tls-native", not(feature = "tls-rustls")))]
                        {
                            let tls = axum_server::tls_openssl::OpenSSLConfig::from_pem_file(
                                &_tls_config.certificate_path,
                                &_tls_config.key_path,
                            )
                            .expect("Failed to load openssl TLS certificates!");
                            axum_server::bind_openssl(address, tls)
                                .serve(app.into_make_service())
                                .await
                                .map_err(anyhow::Error::from)
                        }
                    }

                    #[cfg(not(any(feature = "tls-rustls", feature = "tls-native")))]
                    Err(anyhow::anyhow!(
                        "HTTP Server TLS configuration provided but no TLS features enabled. Compile with a TLS backend feature!"
                    ))
                }
                None => {
                    info!("Starting HTTP (insecure) server on {address}");
                    axum_server::bind(address)
                        .serve(app.into_make_service())
                        .await
                        .map_err(anyhow::Error::from)
                }
            };

            if let Err(e) = result {
                error!("Server error: {e:?}");
            }
        });

        Ok(handle)
    }
}
