//! Main application orchestration.
//!
//! Wires the components together and runs the two routing tasks:
//! - tick router: feed channel -> strategy engine -> risk gate -> ledger
//! - event router: ledger events -> risk/strategy updates and pipeline
//!   outbound dispatch
//!
//! All cross-component communication is typed channels; no component
//! calls back into another from inside its own lock.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use keel_core::{Fill, OrderIntent, OrderSide, OrderState, Price, Qty, Tick};
use keel_exec::{Connectivity, ExecutionPipeline, SimVenue};
use keel_feed::FeedHandler;
use keel_ledger::{ExecutionReport, OrderEvent, OrderLedger};
use keel_risk::RiskGate;
use keel_strategy::{MeanReversionStrategy, StrategyEngine};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Pacing between synthetic demo ticks.
const DEMO_TICK_INTERVAL: Duration = Duration::from_millis(20);
/// Grace period for in-flight work to settle during the demo.
const DEMO_SETTLE: Duration = Duration::from_millis(200);

/// Main application.
pub struct Application {
    config: AppConfig,
    feed: Arc<FeedHandler>,
    engine: Arc<StrategyEngine>,
    risk: Arc<RiskGate>,
    ledger: Arc<OrderLedger>,
    pipeline: Arc<ExecutionPipeline>,
    venue: Arc<SimVenue>,
    tick_rx: Option<mpsc::Receiver<Tick>>,
    event_rx: Option<mpsc::Receiver<OrderEvent>>,
    workers: Vec<JoinHandle<()>>,
}

impl Application {
    /// Create and wire all components. Venue sessions are established
    /// here; a failed session is fatal.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let (tick_tx, tick_rx) = mpsc::channel(config.feed.channel_capacity);
        let feed = Arc::new(FeedHandler::new(config.feed.queue_capacity, tick_tx));

        let (event_tx, event_rx) = mpsc::channel(config.feed.channel_capacity);
        let ledger = Arc::new(OrderLedger::new(event_tx));
        let risk = Arc::new(RiskGate::new(config.risk.clone()));

        let venue = Arc::new(SimVenue::new());
        for session in config.venue_sessions() {
            if !venue.connect(session.market, &session.endpoint, &session.credentials) {
                return Err(AppError::Config(format!(
                    "cannot establish venue session for {}",
                    session.market
                )));
            }
            feed.connect_to_market(session.market, &session.endpoint);
        }

        let pipeline = Arc::new(ExecutionPipeline::new(
            Arc::clone(&venue) as Arc<dyn Connectivity>,
            Arc::clone(&ledger),
        ));

        let engine = Arc::new(StrategyEngine::new());
        engine.register(Box::new(MeanReversionStrategy::new(
            config.strategy.instrument,
            config.strategy.market,
            config.strategy.window_size,
            config.strategy.threshold,
            Qty::new(config.strategy.order_qty),
        )));

        Ok(Self {
            config,
            feed,
            engine,
            risk,
            ledger,
            pipeline,
            venue,
            tick_rx: Some(tick_rx),
            event_rx: Some(event_rx),
            workers: Vec::new(),
        })
    }

    /// Start every component and spawn the routing tasks. Idempotent
    /// per component; router tasks spawn once.
    pub fn start(&mut self) -> AppResult<()> {
        self.engine.start();
        if let Some((outbound, inbound)) = self.pipeline.start() {
            self.workers.push(outbound);
            self.workers.push(inbound);
        }
        self.feed.subscribe(self.config.strategy.instrument);
        if let Some(worker) = self.feed.start() {
            self.workers.push(worker);
        }

        if let Some(tick_rx) = self.tick_rx.take() {
            self.workers.push(tokio::spawn(tick_router(
                tick_rx,
                Arc::clone(&self.engine),
                Arc::clone(&self.risk),
                Arc::clone(&self.ledger),
            )));
        }
        if let Some(event_rx) = self.event_rx.take() {
            self.workers.push(tokio::spawn(event_router(
                event_rx,
                Arc::clone(&self.risk),
                Arc::clone(&self.engine),
                Arc::clone(&self.pipeline),
            )));
        }

        info!("application started");
        Ok(())
    }

    /// Stop every component and abort the routing tasks.
    pub fn shutdown(&mut self) {
        self.feed.stop();
        self.engine.stop();
        self.pipeline.stop();
        for worker in self.workers.drain(..) {
            worker.abort();
        }
        info!("application stopped");
    }

    /// Run the bundled demo: drive a synthetic price path through the
    /// full tick -> signal -> risk -> ledger -> venue flow, then report
    /// and shut down.
    pub async fn run(&mut self) -> AppResult<()> {
        self.start()?;

        let instrument = self.config.strategy.instrument;
        let window = self.config.strategy.window_size;

        // Stable phase fills the strategy window, then a sharp drop
        // below the rolling mean triggers a buy signal.
        let base = Decimal::from(100);
        for i in 0..(window + 10) {
            let mid = if i < window {
                base
            } else {
                base - Decimal::from(i - window + 3)
            };
            let tick = Tick::new(
                instrument,
                Price::new(mid - Decimal::new(5, 2)),
                Qty::new(Decimal::from(100)),
                Price::new(mid + Decimal::new(5, 2)),
                Qty::new(Decimal::from(100)),
            );
            self.feed.push_tick(tick);
            sleep(DEMO_TICK_INTERVAL).await;
        }
        sleep(DEMO_SETTLE).await;

        // Probe order exercising the fill path end to end.
        let probe = OrderIntent::limit(
            instrument,
            OrderSide::Buy,
            Price::new(base),
            Qty::new(Decimal::ONE),
            self.config.strategy.market,
        );
        match self.risk.check_order(&probe) {
            Ok(()) => {
                let id = self.ledger.submit(&probe)?;
                sleep(DEMO_SETTLE).await;
                let fill = Fill {
                    quantity: probe.quantity,
                    price: probe.price,
                };
                self.pipeline
                    .submit_report(ExecutionReport::fill(id, OrderState::Filled, fill))?;
                sleep(DEMO_SETTLE).await;
                info!(order_id = id, state = %self.ledger.status(id), "probe order settled");
            }
            Err(violation) => warn!(%violation, "probe order rejected by risk gate"),
        }

        self.report();
        self.shutdown();
        Ok(())
    }

    fn report(&self) {
        let position = self.risk.position(self.config.strategy.instrument);
        info!(
            ticks_received = self.feed.ticks_received(),
            orders_submitted = self.ledger.orders_submitted(),
            orders_filled = self.ledger.orders_filled(),
            orders_dispatched = self.pipeline.orders_dispatched(),
            venue_orders_sent = self.venue.orders_sent(),
            position_qty = %position.quantity,
            position_ok = self.risk.check_position(&position),
            total_value = %self.risk.total_value(),
            daily_pnl = %self.risk.daily_pnl(),
            daily_loss_ok = self.risk.daily_loss_ok(),
            drawdown_ok = self.risk.drawdown_ok(),
            "session summary"
        );
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn feed(&self) -> &Arc<FeedHandler> {
        &self.feed
    }

    pub fn engine(&self) -> &Arc<StrategyEngine> {
        &self.engine
    }

    pub fn risk(&self) -> &Arc<RiskGate> {
        &self.risk
    }

    pub fn ledger(&self) -> &Arc<OrderLedger> {
        &self.ledger
    }

    pub fn pipeline(&self) -> &Arc<ExecutionPipeline> {
        &self.pipeline
    }
}

/// Route ticks into the strategy engine and submit the surviving
/// intents: every intent passes the risk gate before it reaches the
/// ledger.
async fn tick_router(
    mut tick_rx: mpsc::Receiver<Tick>,
    engine: Arc<StrategyEngine>,
    risk: Arc<RiskGate>,
    ledger: Arc<OrderLedger>,
) {
    while let Some(tick) = tick_rx.recv().await {
        for intent in engine.process_tick(&tick) {
            match risk.check_order(&intent) {
                Ok(()) => match ledger.submit(&intent) {
                    Ok(id) => debug!(order_id = id, "intent accepted"),
                    Err(err) => warn!(%err, "intent rejected by ledger"),
                },
                Err(violation) => {
                    warn!(%violation, instrument = intent.instrument, "intent rejected by risk gate");
                }
            }
        }
    }
    debug!("tick router exiting");
}

/// Fan order events out to the interested components.
async fn event_router(
    mut event_rx: mpsc::Receiver<OrderEvent>,
    risk: Arc<RiskGate>,
    engine: Arc<StrategyEngine>,
    pipeline: Arc<ExecutionPipeline>,
) {
    while let Some(event) = event_rx.recv().await {
        if let Some(fill) = &event.fill {
            risk.update_position(&event.order, fill);
        }
        engine.process_order_update(&event.order);

        // Pending states are requests awaiting wire dispatch.
        if matches!(
            event.order.state,
            OrderState::PendingNew | OrderState::PendingCancel
        ) {
            if let Err(err) = pipeline.dispatch(event.order.clone()) {
                debug!(%err, order_id = event.order.id, "dispatch skipped");
            }
        }
    }
    debug!("event router exiting");
}
