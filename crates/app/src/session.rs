//! Session
//!
//! One customer session: the flow controller plus the backend calls that
//! shadow it. The local cart is always authoritative — backend mirroring is
//! best-effort and a mirror failure never blocks the customer.
//!
//! Every backend call captures the session generation at issue time. A
//! session reset (cancel, timeout, new order) advances the generation, so a
//! response that arrives late is recognized as stale and ignored instead of
//! being applied to the next customer's cart.

use std::time::Instant;

use async_trait::async_trait;
use jiff::Timestamp;
use rusty_money::iso::Currency;
use thiserror::Error;
use tracing::{debug, info, warn};

use borne::{
    cart::{CartStateError, LineId},
    catalog::Product,
    flow::{FlowController, FlowError, FlowEvent},
    orders::{Order, OrderNumber},
};

use crate::client::{ApiError, BorneClient, CartItemDto, OrderAck, OrderPayload};

/// The backend operations a session needs. [`BorneClient`] is the production
/// implementation; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderBackend {
    /// Opens a backend-side cart mirror, returning its id.
    async fn create_cart(&self) -> Result<String, ApiError>;

    /// Mirrors one added line into the backend cart.
    async fn add_to_cart(&self, cart_id: &str, item: &CartItemDto) -> Result<(), ApiError>;

    /// Removes a product from the backend cart mirror.
    async fn remove_from_cart(&self, cart_id: &str, product_id: &str) -> Result<(), ApiError>;

    /// Submits a finalized order.
    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderAck, ApiError>;
}

#[async_trait]
impl OrderBackend for BorneClient {
    async fn create_cart(&self) -> Result<String, ApiError> {
        BorneClient::create_cart(self).await
    }

    async fn add_to_cart(&self, cart_id: &str, item: &CartItemDto) -> Result<(), ApiError> {
        BorneClient::add_to_cart(self, cart_id, item).await
    }

    async fn remove_from_cart(&self, cart_id: &str, product_id: &str) -> Result<(), ApiError> {
        BorneClient::remove_from_cart(self, cart_id, product_id).await
    }

    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderAck, ApiError> {
        BorneClient::create_order(self, payload).await
    }
}

/// Session-level failures: a flow or cart rejection, a backend failure, or a
/// response that lost its race against a session reset.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A flow transition was rejected.
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// A cart mutation was rejected.
    #[error(transparent)]
    Cart(#[from] CartStateError),

    /// A backend call failed; the cart is untouched and the call retryable.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The session was reset while the call was in flight; the response was
    /// discarded.
    #[error("response superseded by a session reset")]
    Superseded,
}

/// One kiosk customer session.
#[derive(Debug)]
pub struct KioskSession<B> {
    flow: FlowController<'static>,
    backend: B,
    generation: u64,
    backend_cart: Option<String>,
}

impl<B: OrderBackend> KioskSession<B> {
    /// Creates a fresh session on the welcome screen.
    #[must_use]
    pub fn new(backend: B, currency: &'static Currency) -> Self {
        KioskSession {
            flow: FlowController::new(currency),
            backend,
            generation: 0,
            backend_cart: None,
        }
    }

    /// The flow controller.
    pub fn flow(&self) -> &FlowController<'static> {
        &self.flow
    }

    /// Mutable flow controller access for screen transitions and cart edits.
    pub fn flow_mut(&mut self) -> &mut FlowController<'static> {
        &mut self.flow
    }

    /// Current session generation. Advances on every reset.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Opens the backend cart mirror. Best-effort: a failure is logged and
    /// the session continues with the local cart only.
    pub async fn open_backend_cart(&mut self) {
        let generation = self.generation;

        match self.backend.create_cart().await {
            Ok(cart_id) => {
                if self.generation == generation {
                    debug!(%cart_id, "backend cart ready");
                    self.backend_cart = Some(cart_id);
                } else {
                    debug!("discarding backend cart from a superseded session");
                }
            }
            Err(error) => {
                warn!(%error, "backend cart creation failed; continuing locally");
            }
        }
    }

    /// Adds a product to the cart and mirrors the line to the backend when a
    /// backend cart is open. The local add is authoritative; a mirror
    /// failure is logged, never surfaced to the customer.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError::Cart`] when the cart rejects the addition.
    pub async fn add_item(
        &mut self,
        product: &Product<'static>,
        excluded_ingredients: &[&str],
        selected_extras: &[&str],
        now: Instant,
    ) -> Result<LineId, SessionError> {
        self.flow.touch(now);

        let line_id = self
            .flow
            .cart_mut()
            .add_item(product, excluded_ingredients, selected_extras)?;

        if let Some(cart_id) = self.backend_cart.clone() {
            let item = self
                .flow
                .cart()
                .line(line_id)
                .map(CartItemDto::from);

            if let Some(item) = item {
                let generation = self.generation;

                match self.backend.add_to_cart(&cart_id, &item).await {
                    Ok(()) => {
                        if self.generation != generation {
                            debug!("ignoring stale add-to-cart response");
                        }
                    }
                    Err(error) => {
                        warn!(%error, "cart mirror failed; the local cart stays authoritative");
                    }
                }
            }
        }

        Ok(line_id)
    }

    /// Removes a line locally and mirrors the removal to the backend cart.
    /// As with additions, the mirror is best-effort.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError::Cart`] when the cart rejects the removal.
    pub async fn remove_item(&mut self, line_id: LineId, now: Instant) -> Result<(), SessionError> {
        self.flow.touch(now);

        let product_id = self
            .flow
            .cart()
            .line(line_id)
            .map(|line| line.product().id.clone());

        self.flow.cart_mut().remove_item(line_id)?;

        if let (Some(cart_id), Some(product_id)) = (self.backend_cart.clone(), product_id) {
            let generation = self.generation;

            match self.backend.remove_from_cart(&cart_id, &product_id).await {
                Ok(()) => {
                    if self.generation != generation {
                        debug!("ignoring stale remove-from-cart response");
                    }
                }
                Err(error) => {
                    warn!(%error, "cart mirror failed; the local cart stays authoritative");
                }
            }
        }

        Ok(())
    }

    /// Submits the checkout snapshot to the backend and, on success,
    /// finalizes the order locally. On a backend failure the cart and the
    /// payment screen are left untouched so the customer can retry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Flow`] when no checkout snapshot or payment
    /// method is in place, [`SessionError::Api`] on backend failure, or
    /// [`SessionError::Superseded`] if the session reset mid-flight.
    pub async fn submit_order(&mut self, now: Instant) -> Result<&Order<'static>, SessionError> {
        let Some(draft) = self.flow.draft() else {
            return Err(SessionError::Flow(FlowError::WrongScreen {
                action: "submit the order",
                screen: self.flow.screen(),
            }));
        };

        if self.flow.payment_method().is_none() {
            return Err(SessionError::Flow(FlowError::NoPaymentMethod));
        }

        let number = OrderNumber::generate();
        let created_at = Timestamp::now();
        let payload = OrderPayload::from_draft(draft, number, created_at);
        let generation = self.generation;

        let ack = self.backend.create_order(&payload).await?;

        if self.generation != generation {
            debug!("discarding order acknowledgement from a superseded session");

            return Err(SessionError::Superseded);
        }

        info!(order_id = %ack.id, number = %number, "order accepted by the backend");

        Ok(self.flow.confirm_payment_as(number, created_at, now)?)
    }

    /// Cancels from the menu and abandons any in-flight backend work.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Flow`] away from the menu screen.
    pub fn cancel(&mut self, now: Instant) -> Result<(), SessionError> {
        self.flow.cancel(now)?;
        self.abandon();

        Ok(())
    }

    /// Starts the next customer's session from the confirmation screen.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Flow`] away from the confirmation screen.
    pub fn new_order(&mut self, now: Instant) -> Result<(), SessionError> {
        self.flow.new_order(now)?;
        self.abandon();

        Ok(())
    }

    /// Polls the session timers. A fired timeout resets the session and
    /// invalidates in-flight backend responses.
    pub fn tick(&mut self, now: Instant) -> Option<FlowEvent> {
        let event = self.flow.poll(now);

        if let Some(event) = event {
            info!(?event, "session reset by timer");
            self.abandon();
        }

        event
    }

    fn abandon(&mut self) {
        self.generation += 1;
        self.backend_cart = None;
    }
}
