//! Flow
//!
//! The order flow controller: a state machine over the kiosk screens that
//! owns the cart and the session timers. The UI layer dispatches transitions
//! and subscribes to the resulting state; it holds no ordering state of its
//! own.
//!
//! Time is always passed in, never read ambiently, so every timeout path is
//! deterministic under test. The timers are owned by the controller and
//! cancelled on every transition away from the screen that armed them.

use std::time::{Duration, Instant};

use jiff::Timestamp;
use rusty_money::iso::Currency;
use thiserror::Error;

use crate::{
    cart::{Cart, CartEmptyError, CartStateError},
    orders::{Order, OrderDraft, OrderNumber, OrderType},
};

/// How long the simulated payment processing takes. The app sleeps for this
/// long between the confirm tap and the confirmation screen. Inherited from
/// the source system; a real payment terminal would replace it.
pub const PAYMENT_PROCESSING_DELAY: Duration = Duration::from_secs(2);

/// Idle time after which a stalled session is abandoned and the kiosk
/// returns to the welcome screen.
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(120);

/// How long the confirmation screen stays up before the kiosk resets for the
/// next customer.
pub const CONFIRMATION_COUNTDOWN: Duration = Duration::from_secs(30);

/// The kiosk screens, in their normal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Attract loop; a touch starts a session
    Welcome,

    /// Dine-in or takeaway choice
    OrderTypeChoice,

    /// Category browsing and cart editing
    Menu,

    /// Payment method choice and confirm
    Payment,

    /// Order number display and reset countdown
    Confirmation,
}

/// Payment methods offered at the kiosk. The choice only changes what the
/// screen displays; it never gates completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    /// Card reader on the kiosk
    Card,

    /// Pay at the counter
    Counter,
}

/// Timeout events surfaced by [`FlowController::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    /// The inactivity deadline passed; the session was abandoned.
    InactivityExpired,

    /// The confirmation countdown ran out; the kiosk reset itself.
    CountdownElapsed,
}

/// Rejected flow transitions. All of these are user-correctable or guard
/// against out-of-order UI dispatch; none change any state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    /// Checkout was attempted with an empty cart.
    #[error(transparent)]
    EmptyCart(#[from] CartEmptyError),

    /// A cart transition was rejected.
    #[error(transparent)]
    Cart(#[from] CartStateError),

    /// Payment was confirmed before choosing a method.
    #[error("no payment method selected")]
    NoPaymentMethod,

    /// A transition dispatched from the wrong screen.
    #[error("cannot {action} from the {screen:?} screen")]
    WrongScreen {
        /// What was attempted
        action: &'static str,
        /// Screen the controller was on
        screen: Screen,
    },
}

#[derive(Debug, Default)]
struct SessionTimers {
    inactivity: Option<Instant>,
    countdown: Option<Instant>,
}

/// State machine driving one customer session from welcome to confirmation.
#[derive(Debug)]
pub struct FlowController<'a> {
    screen: Screen,
    cart: Cart<'a>,
    payment_method: Option<PaymentMethod>,
    draft: Option<OrderDraft<'a>>,
    order: Option<Order<'a>>,
    timers: SessionTimers,
}

impl<'a> FlowController<'a> {
    /// Creates a controller on the welcome screen with an empty cart.
    #[must_use]
    pub fn new(currency: &'static Currency) -> Self {
        FlowController {
            screen: Screen::Welcome,
            cart: Cart::new(currency),
            payment_method: None,
            draft: None,
            order: None,
            timers: SessionTimers::default(),
        }
    }

    /// Current screen.
    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// The session cart.
    pub fn cart(&self) -> &Cart<'a> {
        &self.cart
    }

    /// Mutable access to the cart for menu-time item operations. Callers
    /// should also [`touch`](Self::touch) on the triggering interaction.
    pub fn cart_mut(&mut self) -> &mut Cart<'a> {
        &mut self.cart
    }

    /// The checkout snapshot held while the payment screen is up.
    pub fn draft(&self) -> Option<&OrderDraft<'a>> {
        self.draft.as_ref()
    }

    /// The finalized order shown on the confirmation screen.
    pub fn order(&self) -> Option<&Order<'a>> {
        self.order.as_ref()
    }

    /// Currently selected payment method.
    #[must_use]
    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    /// Registers a customer interaction, pushing the inactivity deadline
    /// back. A no-op on screens without an inactivity timer.
    pub fn touch(&mut self, now: Instant) {
        if self.timers.inactivity.is_some() {
            self.timers.inactivity = Some(now + INACTIVITY_TIMEOUT);
        }
    }

    /// Welcome → order type choice.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::WrongScreen`] from any other screen.
    pub fn start(&mut self, now: Instant) -> Result<(), FlowError> {
        self.expect_screen(Screen::Welcome, "start an order")?;
        self.enter(Screen::OrderTypeChoice, now);

        Ok(())
    }

    /// Order type choice → menu.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::WrongScreen`] from any other screen.
    pub fn choose_order_type(
        &mut self,
        order_type: OrderType,
        now: Instant,
    ) -> Result<(), FlowError> {
        self.expect_screen(Screen::OrderTypeChoice, "choose an order type")?;
        self.cart.set_order_type(order_type)?;
        self.enter(Screen::Menu, now);

        Ok(())
    }

    /// Menu → payment. Guarded: the cart must hold at least one line; the
    /// checkout snapshot is frozen here.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::EmptyCart`] for an empty cart (cart unchanged),
    /// or [`FlowError::WrongScreen`] from any other screen.
    pub fn go_to_payment(&mut self, now: Instant) -> Result<(), FlowError> {
        self.expect_screen(Screen::Menu, "go to payment")?;

        let draft = self.cart.checkout()?;

        self.draft = Some(draft);
        self.payment_method = None;
        self.enter(Screen::Payment, now);

        Ok(())
    }

    /// Payment → menu back navigation; the cart thaws for more editing.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::WrongScreen`] from any other screen.
    pub fn back_to_menu(&mut self, now: Instant) -> Result<(), FlowError> {
        self.expect_screen(Screen::Payment, "return to the menu")?;
        self.cart.reopen()?;
        self.draft = None;
        self.payment_method = None;
        self.enter(Screen::Menu, now);

        Ok(())
    }

    /// Chooses a payment method on the payment screen.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::WrongScreen`] from any other screen.
    pub fn select_payment(
        &mut self,
        method: PaymentMethod,
        now: Instant,
    ) -> Result<(), FlowError> {
        self.expect_screen(Screen::Payment, "select a payment method")?;
        self.payment_method = Some(method);
        self.touch(now);

        Ok(())
    }

    /// Completes payment: finalizes the order with a freshly drawn number,
    /// clears the cart and enters the confirmation screen. The method choice
    /// never gates this; payment is simulated.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::NoPaymentMethod`] if no method was selected, or
    /// [`FlowError::WrongScreen`] away from the payment screen.
    pub fn confirm_payment(&mut self, now: Instant) -> Result<&Order<'a>, FlowError> {
        self.confirm_payment_as(OrderNumber::generate(), Timestamp::now(), now)
    }

    /// [`confirm_payment`](Self::confirm_payment) with the order number and
    /// timestamp supplied by the caller — the session runtime pre-draws the
    /// number so it can submit the order to the backend first.
    ///
    /// # Errors
    ///
    /// As [`confirm_payment`](Self::confirm_payment).
    pub fn confirm_payment_as(
        &mut self,
        number: OrderNumber,
        created_at: Timestamp,
        now: Instant,
    ) -> Result<&Order<'a>, FlowError> {
        self.expect_screen(Screen::Payment, "confirm payment")?;

        if self.payment_method.is_none() {
            return Err(FlowError::NoPaymentMethod);
        }

        let order = self.cart.confirm(number, created_at)?;

        self.draft = None;
        self.enter(Screen::Confirmation, now);

        Ok(&*self.order.insert(order))
    }

    /// Menu → welcome cancel path: the session is abandoned and the cart
    /// cleared.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::WrongScreen`] from any other screen.
    pub fn cancel(&mut self, now: Instant) -> Result<(), FlowError> {
        self.expect_screen(Screen::Menu, "cancel the order")?;
        self.reset(now);

        Ok(())
    }

    /// Confirmation → welcome: the customer (or the countdown) asked for a
    /// fresh session.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::WrongScreen`] from any other screen.
    pub fn new_order(&mut self, now: Instant) -> Result<(), FlowError> {
        self.expect_screen(Screen::Confirmation, "start a new order")?;
        self.reset(now);

        Ok(())
    }

    /// Checks the session timers. Fires at most one event per call: the
    /// inactivity timeout on ordering screens, or the confirmation countdown.
    /// Either one force-clears the cart and returns to the welcome screen.
    pub fn poll(&mut self, now: Instant) -> Option<FlowEvent> {
        if let Some(deadline) = self.timers.inactivity
            && now >= deadline
        {
            self.reset(now);

            return Some(FlowEvent::InactivityExpired);
        }

        if let Some(deadline) = self.timers.countdown
            && now >= deadline
        {
            self.reset(now);

            return Some(FlowEvent::CountdownElapsed);
        }

        None
    }

    /// Time left on the confirmation countdown, while it is running.
    pub fn countdown_remaining(&self, now: Instant) -> Option<Duration> {
        self.timers
            .countdown
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    fn expect_screen(&self, screen: Screen, action: &'static str) -> Result<(), FlowError> {
        if self.screen == screen {
            Ok(())
        } else {
            Err(FlowError::WrongScreen {
                action,
                screen: self.screen,
            })
        }
    }

    fn enter(&mut self, screen: Screen, now: Instant) {
        self.screen = screen;

        match screen {
            Screen::Welcome => {
                self.timers.inactivity = None;
                self.timers.countdown = None;
            }
            Screen::Confirmation => {
                self.timers.inactivity = None;
                self.timers.countdown = Some(now + CONFIRMATION_COUNTDOWN);
            }
            Screen::OrderTypeChoice | Screen::Menu | Screen::Payment => {
                self.timers.inactivity = Some(now + INACTIVITY_TIMEOUT);
                self.timers.countdown = None;
            }
        }
    }

    fn reset(&mut self, now: Instant) {
        self.cart.clear();
        self.draft = None;
        self.payment_method = None;
        self.order = None;
        self.enter(Screen::Welcome, now);
    }
}
