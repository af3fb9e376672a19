//! Venue connectivity seam and the simulated venue.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info, warn};

use keel_core::{Market, Order, OrderId};

/// Wire-side order transport.
///
/// The pipeline only ever talks to the venue through this trait; a real
/// adapter and the simulation are interchangeable. Methods report plain
/// success/failure; the caller decides what a failure means for order
/// state (nothing, in the pipeline's case).
#[cfg_attr(test, mockall::automock)]
pub trait Connectivity: Send + Sync {
    /// Establish a session with a market. Returns false when the
    /// connection cannot be established.
    fn connect(&self, market: Market, endpoint: &str, credentials: &str) -> bool;

    /// Dispatch a new order to its market.
    fn send_order(&self, order: &Order) -> bool;

    /// Dispatch a cancel request.
    fn cancel_order(&self, id: OrderId, market: Market) -> bool;

    /// Whether a session with this market is up.
    fn is_connected(&self, market: Market) -> bool;
}

#[derive(Debug, Clone)]
struct ConnectionInfo {
    endpoint: String,
    #[allow(dead_code)]
    credentials: String,
    last_heartbeat: DateTime<Utc>,
}

/// In-process venue simulation.
///
/// Accepts every message for a connected market and refuses everything
/// else. Tracks per-market sessions with heartbeat timestamps plus
/// sent-message counters.
#[derive(Debug, Default)]
pub struct SimVenue {
    connections: DashMap<Market, ConnectionInfo>,
    orders_sent: AtomicU64,
    cancels_sent: AtomicU64,
}

impl SimVenue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders accepted by `send_order`.
    pub fn orders_sent(&self) -> u64 {
        self.orders_sent.load(Ordering::Relaxed)
    }

    /// Cancels accepted by `cancel_order`.
    pub fn cancels_sent(&self) -> u64 {
        self.cancels_sent.load(Ordering::Relaxed)
    }

    /// Endpoint recorded for a market session, if one is up.
    pub fn endpoint(&self, market: Market) -> Option<String> {
        self.connections.get(&market).map(|info| info.endpoint.clone())
    }

    fn touch(&self, market: Market) -> bool {
        match self.connections.get_mut(&market) {
            Some(mut info) => {
                info.last_heartbeat = Utc::now();
                true
            }
            None => false,
        }
    }
}

impl Connectivity for SimVenue {
    fn connect(&self, market: Market, endpoint: &str, credentials: &str) -> bool {
        if market == Market::Unknown {
            warn!("refusing connection to unknown market");
            return false;
        }
        info!(%market, endpoint, "simulated venue session established");
        self.connections.insert(
            market,
            ConnectionInfo {
                endpoint: endpoint.to_string(),
                credentials: credentials.to_string(),
                last_heartbeat: Utc::now(),
            },
        );
        true
    }

    fn send_order(&self, order: &Order) -> bool {
        if !self.touch(order.market) {
            warn!(order_id = order.id, market = %order.market, "send_order without session");
            return false;
        }
        self.orders_sent.fetch_add(1, Ordering::Relaxed);
        debug!(order_id = order.id, market = %order.market, "order sent to simulated venue");
        true
    }

    fn cancel_order(&self, id: OrderId, market: Market) -> bool {
        if !self.touch(market) {
            warn!(order_id = id, %market, "cancel_order without session");
            return false;
        }
        self.cancels_sent.fetch_add(1, Ordering::Relaxed);
        debug!(order_id = id, %market, "cancel sent to simulated venue");
        true
    }

    fn is_connected(&self, market: Market) -> bool {
        self.connections.contains_key(&market)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::{OrderIntent, OrderSide, Price, Qty};
    use rust_decimal_macros::dec;

    fn order(market: Market) -> Order {
        let intent = OrderIntent::limit(
            1,
            OrderSide::Buy,
            Price::new(dec!(10)),
            Qty::new(dec!(1)),
            market,
        );
        Order::from_intent(1, &intent)
    }

    #[test]
    fn test_messages_require_a_session() {
        let venue = SimVenue::new();

        assert!(!venue.send_order(&order(Market::UsaNyse)));
        assert!(!venue.cancel_order(1, Market::UsaNyse));

        assert!(venue.connect(Market::UsaNyse, "sim://nyse", "demo"));
        assert!(venue.is_connected(Market::UsaNyse));
        assert!(venue.send_order(&order(Market::UsaNyse)));
        assert!(venue.cancel_order(1, Market::UsaNyse));

        assert_eq!(venue.orders_sent(), 1);
        assert_eq!(venue.cancels_sent(), 1);
    }

    #[test]
    fn test_unknown_market_refused() {
        let venue = SimVenue::new();
        assert!(!venue.connect(Market::Unknown, "sim://nowhere", "demo"));
    }

    #[test]
    fn test_sessions_are_per_market() {
        let venue = SimVenue::new();
        venue.connect(Market::HongKong, "sim://hkex", "demo");

        assert!(venue.is_connected(Market::HongKong));
        assert!(!venue.is_connected(Market::UsaNasdaq));
        assert!(!venue.send_order(&order(Market::UsaNasdaq)));
    }

    #[test]
    fn test_endpoint_recorded_per_session() {
        let venue = SimVenue::new();
        venue.connect(Market::HongKong, "sim://hkex", "demo");

        assert_eq!(venue.endpoint(Market::HongKong).as_deref(), Some("sim://hkex"));
        assert_eq!(venue.endpoint(Market::UsaNyse), None);
    }
}
