pub mod application;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::invoice_service::InvoiceService;
use infrastructure::{
    DieselInvoiceDetailRepository, DieselInvoiceRepository, DieselOperatorRepository,
    DieselProductRepository, DieselSettlementService, DieselSupplierRepository,
};

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// The invoice service wired to the Diesel/PostgreSQL stores.
pub type AppInvoiceService = InvoiceService<
    DieselInvoiceRepository,
    DieselOperatorRepository,
    DieselInvoiceDetailRepository,
    DieselSupplierRepository,
    DieselProductRepository,
    DieselSettlementService,
>;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
    log::info!("Applied {} pending migrations", applied.len());
}

pub fn build_service(pool: DbPool) -> AppInvoiceService {
    InvoiceService::new(
        DieselInvoiceRepository::new(pool.clone()),
        DieselOperatorRepository::new(pool.clone()),
        DieselInvoiceDetailRepository::new(pool.clone()),
        DieselSupplierRepository::new(pool.clone()),
        DieselProductRepository::new(pool.clone()),
        DieselSettlementService::new(pool),
    )
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    use handlers::invoices;

    let service = web::Data::new(build_service(pool));
    let openapi = handlers::ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(Logger::default())
            .service(
                web::scope("/invoices")
                    .route("", web::get().to(invoices::list_invoices))
                    .route("", web::post().to(invoices::create_invoice))
                    // Registered before `/{id}` so the literal segment wins.
                    .route("/recovery-rate", web::get().to(invoices::recovery_rate))
                    .route("/{id}", web::get().to(invoices::get_invoice))
                    .route("/{id}/details", web::post().to(invoices::add_invoice_details))
                    .route("/{id}/cancel", web::put().to(invoices::cancel_invoice)),
            )
            .route(
                "/suppliers/{id}/invoices",
                web::get().to(invoices::list_supplier_invoices),
            )
            .route(
                "/operators/{operator_id}/invoices/{invoice_id}",
                web::put().to(invoices::assign_operator),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
