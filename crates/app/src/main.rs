//! Borne kiosk runtime: drives one scripted customer session end to end and
//! prints the resulting ticket. With `--offline` the embedded menu is used
//! and no backend is contacted for ordering.

use std::time::Instant;

use clap::Parser;
use thiserror::Error;
use tracing::{info, warn};

use borne::{
    catalog::{Catalog, ProductKey},
    fixtures,
    flow::{PAYMENT_PROCESSING_DELAY, PaymentMethod},
    orders::{OrderType, ReceiptPayload},
    pricing,
    recommend::RecommendationRules,
};
use borne_app::{
    client::{ApiError, BorneClient},
    config::KioskConfig,
    i18n, logging,
    session::{KioskSession, SessionError},
    ticket,
};

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error(transparent)]
    Fixture(#[from] fixtures::FixtureError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Flow(#[from] borne::flow::FlowError),

    #[error(transparent)]
    Cart(#[from] borne::cart::CartStateError),

    #[error("product {0} missing from the catalog")]
    MissingProduct(String),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let config = KioskConfig::parse();

    logging::init()?;
    info!(kiosk = %config.kiosk_name, locale = %config.locale, "starting kiosk runtime");

    let client = BorneClient::new(config.api_url.as_str(), config.api_timeout())?;
    let (catalog, rules) = load_catalog(&config, &client).await?;

    info!(
        products = catalog.len(),
        categories = catalog.categories().len(),
        media = catalog.welcome_media().len(),
        "catalog ready"
    );

    let (recommender, unresolved) = rules.resolve(&catalog);

    for reference in &unresolved {
        warn!(%reference, "recommendation rule reference skipped");
    }

    let t = config.locale.translations();
    let mut session = KioskSession::new(client, catalog.currency());
    let now = Instant::now();

    session.flow_mut().start(now)?;
    session
        .flow_mut()
        .choose_order_type(OrderType::Takeaway, now)?;

    if !config.offline {
        session.open_backend_cart().await;
    }

    let (burger_key, burger) = catalog
        .product_by_id("burger-classic")
        .ok_or_else(|| AppError::MissingProduct("burger-classic".to_string()))?;

    session
        .add_item(burger, &["onion"], &["extra-cheese"], now)
        .await?;

    info!(
        suggestions = ?product_names(&catalog, &recommender.for_product(&catalog, burger_key, 4)),
        "product page suggestions"
    );

    let (_, fries) = catalog
        .product_by_id("fries")
        .ok_or_else(|| AppError::MissingProduct("fries".to_string()))?;

    let fries_line = session.add_item(fries, &[], &[], now).await?;

    session.flow_mut().cart_mut().update_quantity(fries_line, 2)?;

    info!(
        suggestions = ?product_names(
            &catalog,
            &recommender.for_cart(&catalog, session.flow().cart().lines(), 4),
        ),
        "cart up-sell suggestions"
    );
    info!(
        suggestions = ?product_names(
            &catalog,
            &recommender.last_chance(&catalog, session.flow().cart().lines(), 3),
        ),
        "last-chance suggestions"
    );

    let total = pricing::cart_total(session.flow().cart());

    info!(
        total = %i18n::format_price(&total),
        articles = %t.articles_label(session.flow().cart().item_count()),
        "cart ready for checkout"
    );

    session.flow_mut().go_to_payment(now)?;
    session
        .flow_mut()
        .select_payment(PaymentMethod::Card, now)?;

    info!("processing payment");
    tokio::time::sleep(PAYMENT_PROCESSING_DELAY).await;

    let receipt = complete_order(&mut session, config.offline).await?;

    println!("{}", ticket::render(&receipt, t));

    let remaining = session.flow().countdown_remaining(Instant::now());

    info!(?remaining, "confirmation countdown running");

    session.new_order(Instant::now())?;
    info!("kiosk back on the welcome screen");

    Ok(())
}

async fn load_catalog(
    config: &KioskConfig,
    client: &BorneClient,
) -> Result<(Catalog<'static>, RecommendationRules), AppError> {
    if config.offline {
        info!("offline mode: using the embedded menu");

        return Ok(fixtures::default_menu()?);
    }

    if let Err(error) = client.health().await {
        warn!(%error, "backend health check failed");
    }

    match client.fetch_catalog().await {
        Ok(dto) => {
            let catalog = dto.into_catalog()?;
            let (_, rules) = fixtures::default_menu()?;

            info!("catalog loaded from the backend");

            Ok((catalog, rules))
        }
        Err(error) => {
            warn!(%error, "catalog fetch failed; falling back to the embedded menu");

            Ok(fixtures::default_menu()?)
        }
    }
}

/// Completes payment: against the backend when one is configured, locally in
/// offline mode or when the submission fails (the source system completed
/// unconditionally; a real payment terminal would change this).
async fn complete_order(
    session: &mut KioskSession<BorneClient>,
    offline: bool,
) -> Result<ReceiptPayload<'static>, AppError> {
    let now = Instant::now();

    if offline {
        return Ok(session.flow_mut().confirm_payment(now)?.receipt());
    }

    let submitted = session.submit_order(now).await.map(|order| order.receipt());

    match submitted {
        Ok(receipt) => Ok(receipt),
        Err(SessionError::Api(error)) => {
            warn!(%error, "order submission failed; completing locally");

            Ok(session.flow_mut().confirm_payment(now)?.receipt())
        }
        Err(other) => Err(other.into()),
    }
}

fn product_names(catalog: &Catalog<'_>, keys: &[ProductKey]) -> Vec<String> {
    keys.iter()
        .filter_map(|key| catalog.product(*key).map(|product| product.name.clone()))
        .collect()
}
