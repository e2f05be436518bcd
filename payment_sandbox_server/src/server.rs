use std::{sync::Arc, time::Duration};

use actix_web::{
    dev::Server,
    http::KeepAlive,
    middleware::Logger,
    web,
    web::Data,
    App,
    HttpServer,
};
use log::*;
use payment_sandbox_engine::{IdGenerator, LifecycleApi, MemoryStore, ResourceStore};

use crate::{
    auth::{IntrospectionAuthenticator, StaticAuthenticator, TokenAuthenticator},
    config::ServerConfig,
    errors::ServerError,
    routes::{
        cancel_payment,
        create_consent,
        create_enrollment,
        create_payment,
        get_consent,
        get_enrollment,
        get_payment,
        health,
        revoke_enrollment,
    },
    signing::ResponseSigner,
    trust::ClientRegistry,
    verify::{JwksRequestVerifier, RequestVerifier, UnverifiedRequestVerifier},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let store = MemoryStore::new();
    let srv = create_server_instance(config, store)?;
    Ok(srv.await?)
}

pub fn create_server_instance<B>(config: ServerConfig, store: B) -> Result<Server, ServerError>
where B: ResourceStore + 'static {
    let signer = ResponseSigner::from_config(&config)
        .map_err(|e| ServerError::InitializeError(format!("Could not set up the response signer. {e}")))?;
    let authenticator: Arc<dyn TokenAuthenticator> = if config.validate_token {
        Arc::new(IntrospectionAuthenticator::new(config.introspection.clone()))
    } else {
        warn!("🚨️ Token validation is DISABLED. Every caller is accepted as the reference client. 🚨️");
        Arc::new(StaticAuthenticator)
    };
    let verifier: Arc<dyn RequestVerifier> = if config.validate_signature {
        Arc::new(JwksRequestVerifier::new(ClientRegistry::new(&config.client_details_url)))
    } else {
        warn!("🚨️ Signature validation is DISABLED. Request envelopes are decoded without verification. 🚨️");
        Arc::new(UnverifiedRequestVerifier)
    };
    let host = config.host.clone();
    let port = config.port;
    let consent_prefix = config.consent_id_prefix.clone();
    let enrollment_prefix = config.enrollment_id_prefix.clone();
    let audiences = config.audiences.clone();
    let srv = HttpServer::new(move || {
        let ids = IdGenerator::new(consent_prefix.clone(), enrollment_prefix.clone());
        let api = LifecycleApi::new(store.clone(), ids);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("pis::access_log"))
            .app_data(Data::new(api))
            .app_data(Data::new(signer.clone()))
            .app_data(Data::new(audiences.clone()))
            .app_data(Data::from(authenticator.clone()))
            .app_data(Data::from(verifier.clone()))
            .service(health)
            .route("/consents", web::post().to(create_consent::<B>))
            .route("/consents/{consent_id}", web::get().to(get_consent::<B>))
            .route("/pix/payments", web::post().to(create_payment::<B>))
            .route("/pix/payments/{payment_id}", web::get().to(get_payment::<B>))
            .route("/pix/payments/{payment_id}", web::patch().to(cancel_payment::<B>))
            .route("/enrollments", web::post().to(create_enrollment::<B>))
            .route("/enrollments/{enrollment_id}", web::get().to(get_enrollment::<B>))
            .route("/enrollments/{enrollment_id}", web::patch().to(revoke_enrollment::<B>))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
