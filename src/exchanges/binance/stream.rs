use crate::core::kernel::{TungsteniteWs, WsSession};
use crate::core::types::{AggregationMode, ConnectionState, FlowSnapshot, TradeSide};
use crate::exchanges::binance::codec::{agg_trade_stream, AggTradeCodec};
use crate::exchanges::binance::types::BinanceAggTrade;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Buy/sell accumulator pair shared between the receive loop and the
/// snapshot timer.
///
/// Both `accumulate` and `read_and_reset` take the lock for the whole
/// operation, so a trade arriving during a snapshot lands cleanly in either
/// the old or the new window - never lost, never counted twice.
#[derive(Debug, Default)]
pub struct FlowAccumulator {
    totals: Mutex<(Decimal, Decimal)>,
}

impl FlowAccumulator {
    pub fn accumulate(&self, side: TradeSide, amount: Decimal) {
        let mut totals = self.lock();
        match side {
            TradeSide::Buy => totals.0 += amount,
            TradeSide::Sell => totals.1 += amount,
        }
    }

    /// Atomically read both totals and reset them to zero.
    pub fn read_and_reset(&self) -> (Decimal, Decimal) {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, (Decimal, Decimal)> {
        self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Configuration for a trade-flow aggregator
#[derive(Debug, Clone)]
pub struct TradeFlowConfig {
    pub symbol: String,
    pub mode: AggregationMode,
    /// Cadence of snapshot emission
    pub snapshot_interval: Duration,
    /// Base delay before a reconnection attempt
    pub reconnect_delay: Duration,
    /// Backoff ceiling; the delay doubles per failed attempt up to this
    pub max_reconnect_delay: Duration,
}

impl TradeFlowConfig {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            mode: AggregationMode::Notional,
            snapshot_interval: Duration::from_secs(1),
            reconnect_delay: Duration::from_secs(3),
            max_reconnect_delay: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: AggregationMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub const fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

/// Handle to a running aggregator.
///
/// [`Self::shutdown`] stops the receive loop and the snapshot timer and waits
/// for both to finish. Dropping the handle also stops them (the shutdown
/// channel closes), but without waiting.
pub struct TradeFlowHandle {
    snapshots: broadcast::Sender<FlowSnapshot>,
    state: watch::Receiver<ConnectionState>,
    shutdown: watch::Sender<bool>,
    receive_task: JoinHandle<()>,
    snapshot_task: JoinHandle<()>,
}

impl TradeFlowHandle {
    /// Subscribe to the periodic snapshot feed.
    ///
    /// Lagging receivers drop old snapshots; this is a live feed, not a
    /// history.
    pub fn snapshots(&self) -> broadcast::Receiver<FlowSnapshot> {
        self.snapshots.subscribe()
    }

    /// Observe connection state transitions.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Stop both tasks and close the transport.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.receive_task.await;
        let _ = self.snapshot_task.await;
    }
}

/// Self-healing aggregated view of one symbol's trade flow.
///
/// Two tasks cooperate over a shared [`FlowAccumulator`]: the receive
/// supervisor owns the connection lifecycle (`Connecting -> Open -> Closed ->
/// Reconnecting -> ...`, retrying forever), and the snapshot timer publishes
/// and resets the window on a fixed cadence. Spawning returns as soon as the
/// initial connection attempt is dispatched; connection errors are handled
/// internally and only ever observable through the state channel and logs.
pub struct TradeFlowAggregator;

impl TradeFlowAggregator {
    /// Spawn an aggregator over sessions produced by `make_session`.
    ///
    /// A fresh session is created for every connection cycle; a session that
    /// errors or closes is discarded.
    pub fn spawn<S, F>(config: TradeFlowConfig, make_session: F) -> TradeFlowHandle
    where
        S: WsSession<AggTradeCodec> + Send + 'static,
        F: FnMut() -> S + Send + 'static,
    {
        let accumulator = Arc::new(FlowAccumulator::default());
        let (snapshot_tx, _) = broadcast::channel(64);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let receive_task = tokio::spawn(receive_loop(
            config.clone(),
            make_session,
            Arc::clone(&accumulator),
            state_tx,
            shutdown_rx.clone(),
        ));
        let snapshot_task = tokio::spawn(snapshot_loop(
            config.snapshot_interval,
            accumulator,
            snapshot_tx.clone(),
            shutdown_rx,
        ));

        TradeFlowHandle {
            snapshots: snapshot_tx,
            state: state_rx,
            shutdown: shutdown_tx,
            receive_task,
            snapshot_task,
        }
    }

    /// Spawn an aggregator connected to a live stream host.
    ///
    /// The subscription rides on the URL path
    /// (`<host>/ws/<lowercased-symbol>@aggTrade`), so a fresh connection is
    /// already subscribed after the handshake.
    pub fn connect(stream_base_url: &str, config: TradeFlowConfig) -> TradeFlowHandle {
        let url = format!(
            "{}/ws/{}",
            stream_base_url.trim_end_matches('/'),
            agg_trade_stream(&config.symbol)
        );
        Self::spawn(config, move || {
            TungsteniteWs::new(url.clone(), "binance".to_string(), AggTradeCodec)
        })
    }
}

async fn receive_loop<S, F>(
    config: TradeFlowConfig,
    mut make_session: F,
    accumulator: Arc<FlowAccumulator>,
    state_tx: watch::Sender<ConnectionState>,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    S: WsSession<AggTradeCodec> + Send + 'static,
    F: FnMut() -> S + Send + 'static,
{
    let mut delay = config.reconnect_delay;

    // Iterative supervisor: one loop iteration per connection cycle, retried
    // without bound until shutdown.
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let _ = state_tx.send(ConnectionState::Connecting);
        let mut session = make_session();

        let connected = tokio::select! {
            result = session.connect() => result,
            _ = shutdown_rx.changed() => break,
        };

        match connected {
            Ok(()) => {
                info!(symbol = %config.symbol, "trade stream connected");
                let _ = state_tx.send(ConnectionState::Open);
                delay = config.reconnect_delay;
                // Fresh window for the new cycle; whatever accumulated before
                // the disconnect is discarded.
                accumulator.read_and_reset();

                let keep_running =
                    drive_session(&mut session, &config, &accumulator, &mut shutdown_rx).await;
                let _ = session.close().await;
                let _ = state_tx.send(ConnectionState::Closed);
                if !keep_running {
                    break;
                }
            }
            Err(e) => {
                warn!(symbol = %config.symbol, "trade stream connect failed: {}", e);
            }
        }

        let _ = state_tx.send(ConnectionState::Reconnecting);
        info!(symbol = %config.symbol, "reconnecting in {:?}", delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.changed() => break,
        }
        delay = std::cmp::min(delay * 2, config.max_reconnect_delay);
    }

    let _ = state_tx.send(ConnectionState::Closed);
}

/// Drain one session until it fails or closes.
///
/// Returns `false` when shutdown was requested, `true` when the session ended
/// and a reconnect cycle should follow.
async fn drive_session<S: WsSession<AggTradeCodec>>(
    session: &mut S,
    config: &TradeFlowConfig,
    accumulator: &FlowAccumulator,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> bool {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => return false,
            message = session.next_message() => match message {
                Some(Ok(trade)) => fold_trade(accumulator, config.mode, &trade),
                Some(Err(e)) if e.is_decode_error() => {
                    // Per-frame failure: drop the frame, keep the connection.
                    warn!(symbol = %config.symbol, "discarding malformed frame: {}", e);
                }
                Some(Err(e)) => {
                    warn!(symbol = %config.symbol, "trade stream error: {}", e);
                    return true;
                }
                None => {
                    info!(symbol = %config.symbol, "trade stream closed by server");
                    return true;
                }
            }
        }
    }
}

fn fold_trade(accumulator: &FlowAccumulator, mode: AggregationMode, trade: &BinanceAggTrade) {
    // Buyer-is-maker means the aggressor sold into a resting bid.
    let side = if trade.is_buyer_maker {
        TradeSide::Sell
    } else {
        TradeSide::Buy
    };
    let amount = match mode {
        AggregationMode::Notional => trade.notional(),
        AggregationMode::Count => Decimal::ONE,
    };
    accumulator.accumulate(side, amount);
}

async fn snapshot_loop(
    interval_duration: Duration,
    accumulator: Arc<FlowAccumulator>,
    snapshot_tx: broadcast::Sender<FlowSnapshot>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(interval_duration);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval completes immediately; consume it so
    // the first snapshot covers a full window.
    interval.tick().await;
    let mut window_start = Utc::now();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = interval.tick() => {
                let (buy_total, sell_total) = accumulator.read_and_reset();
                let snapshot = FlowSnapshot {
                    window_start,
                    buy_total,
                    sell_total,
                };
                window_start = Utc::now();
                // Nobody listening is fine; snapshots are fire-and-forget.
                let _ = snapshot_tx.send(snapshot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ExchangeError;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn trade(is_buyer_maker: bool, price: &str, quantity: &str) -> BinanceAggTrade {
        BinanceAggTrade {
            event_time: 0,
            symbol: "BTCUSDT".to_string(),
            price: dec(price),
            quantity: dec(quantity),
            is_buyer_maker,
        }
    }

    enum Step {
        Trade(BinanceAggTrade),
        MalformedFrame,
        ServerClose,
        TransportError,
    }

    /// Session that replays a script, then stays silent forever.
    struct ScriptedSession {
        script: VecDeque<Step>,
        connect_result: Option<ExchangeError>,
        connected: bool,
    }

    impl ScriptedSession {
        fn new(script: Vec<Step>) -> Self {
            Self {
                script: script.into(),
                connect_result: None,
                connected: false,
            }
        }

        fn failing_connect() -> Self {
            Self {
                script: VecDeque::new(),
                connect_result: Some(ExchangeError::NetworkError(
                    "connection refused".to_string(),
                )),
                connected: false,
            }
        }
    }

    #[async_trait]
    impl WsSession<AggTradeCodec> for ScriptedSession {
        async fn connect(&mut self) -> Result<(), ExchangeError> {
            match self.connect_result.take() {
                Some(e) => Err(e),
                None => {
                    self.connected = true;
                    Ok(())
                }
            }
        }

        async fn next_message(&mut self) -> Option<Result<BinanceAggTrade, ExchangeError>> {
            match self.script.pop_front() {
                Some(Step::Trade(trade)) => Some(Ok(trade)),
                Some(Step::MalformedFrame) => Some(Err(ExchangeError::DeserializationError(
                    "missing field".to_string(),
                ))),
                Some(Step::ServerClose) => {
                    self.connected = false;
                    None
                }
                Some(Step::TransportError) => {
                    self.connected = false;
                    Some(Err(ExchangeError::NetworkError("reset".to_string())))
                }
                None => futures::future::pending().await,
            }
        }

        async fn close(&mut self) -> Result<(), ExchangeError> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    /// Factory handing out pre-built sessions, then silent ones.
    fn session_factory(
        sessions: Vec<ScriptedSession>,
    ) -> impl FnMut() -> ScriptedSession + Send + 'static {
        let mut sessions: VecDeque<ScriptedSession> = sessions.into();
        move || sessions.pop_front().unwrap_or_else(|| ScriptedSession::new(Vec::new()))
    }

    fn test_config() -> TradeFlowConfig {
        TradeFlowConfig::new("BTCUSDT").with_reconnect_delay(Duration::from_millis(100))
    }

    async fn wait_for_state(
        mut state: watch::Receiver<ConnectionState>,
        expected: ConnectionState,
    ) {
        while *state.borrow() != expected {
            state.changed().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_totals_and_reset() {
        let session = ScriptedSession::new(vec![
            Step::Trade(trade(true, "100", "2")),
            Step::Trade(trade(false, "50", "4")),
        ]);
        let handle = TradeFlowAggregator::spawn(test_config(), session_factory(vec![session]));
        let mut snapshots = handle.snapshots();

        let first = snapshots.recv().await.unwrap();
        assert_eq!(first.buy_total, dec("200"));
        assert_eq!(first.sell_total, dec("200"));

        // The window resets to zero immediately after emission.
        let second = snapshots.recv().await.unwrap();
        assert_eq!(second.buy_total, Decimal::ZERO);
        assert_eq!(second.sell_total, Decimal::ZERO);
        assert!(second.window_start >= first.window_start);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_mode_counts_trades() {
        let session = ScriptedSession::new(vec![
            Step::Trade(trade(true, "100", "2")),
            Step::Trade(trade(true, "101", "3")),
            Step::Trade(trade(false, "99", "1")),
        ]);
        let config = test_config().with_mode(AggregationMode::Count);
        let handle = TradeFlowAggregator::spawn(config, session_factory(vec![session]));
        let mut snapshots = handle.snapshots();

        let snapshot = snapshots.recv().await.unwrap();
        assert_eq!(snapshot.buy_total, dec("1"));
        assert_eq!(snapshot.sell_total, dec("2"));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frame_is_skipped() {
        let session = ScriptedSession::new(vec![
            Step::Trade(trade(false, "50", "4")),
            Step::MalformedFrame,
            Step::Trade(trade(true, "100", "2")),
        ]);
        let handle = TradeFlowAggregator::spawn(test_config(), session_factory(vec![session]));
        let mut snapshots = handle.snapshots();
        let state = handle.state();

        let snapshot = snapshots.recv().await.unwrap();
        assert_eq!(snapshot.buy_total, dec("200"));
        assert_eq!(snapshot.sell_total, dec("200"));

        // A decode failure never tears down the connection.
        assert_eq!(*state.borrow(), ConnectionState::Open);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_starts_a_fresh_window() {
        let first = ScriptedSession::new(vec![
            Step::Trade(trade(true, "100", "2")),
            Step::ServerClose,
        ]);
        let second = ScriptedSession::new(vec![Step::Trade(trade(false, "50", "4"))]);
        let handle =
            TradeFlowAggregator::spawn(test_config(), session_factory(vec![first, second]));
        let mut snapshots = handle.snapshots();

        // Reconnect (100ms) happens well before the first snapshot (1s); the
        // pre-disconnect sell flow is discarded with the old window.
        let snapshot = snapshots.recv().await.unwrap();
        assert_eq!(snapshot.buy_total, dec("200"));
        assert_eq!(snapshot.sell_total, Decimal::ZERO);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_triggers_reconnect() {
        let first = ScriptedSession::new(vec![Step::TransportError]);
        let second = ScriptedSession::new(vec![Step::Trade(trade(false, "10", "1"))]);
        let handle =
            TradeFlowAggregator::spawn(test_config(), session_factory(vec![first, second]));
        let mut snapshots = handle.snapshots();

        let snapshot = snapshots.recv().await.unwrap();
        assert_eq!(snapshot.buy_total, dec("10"));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_failures_retry_until_success() {
        let handle = TradeFlowAggregator::spawn(
            test_config(),
            session_factory(vec![
                ScriptedSession::failing_connect(),
                ScriptedSession::failing_connect(),
                ScriptedSession::new(Vec::new()),
            ]),
        );

        wait_for_state(handle.state(), ConnectionState::Open).await;
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_both_tasks() {
        let handle = TradeFlowAggregator::spawn(
            test_config(),
            session_factory(vec![ScriptedSession::new(Vec::new())]),
        );
        let state = handle.state();

        wait_for_state(state.clone(), ConnectionState::Open).await;
        handle.shutdown().await;
        assert_eq!(*state.borrow(), ConnectionState::Closed);
    }

    #[test]
    fn test_accumulator_read_and_reset_is_atomic() {
        let accumulator = FlowAccumulator::default();
        accumulator.accumulate(TradeSide::Buy, dec("1.5"));
        accumulator.accumulate(TradeSide::Sell, dec("2.5"));
        accumulator.accumulate(TradeSide::Buy, dec("0.5"));

        assert_eq!(accumulator.read_and_reset(), (dec("2"), dec("2.5")));
        assert_eq!(accumulator.read_and_reset(), (Decimal::ZERO, Decimal::ZERO));
    }

    #[test]
    fn test_accumulator_concurrent_updates_are_not_lost() {
        let accumulator = Arc::new(FlowAccumulator::default());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let accumulator = Arc::clone(&accumulator);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    accumulator.accumulate(TradeSide::Buy, Decimal::ONE);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(accumulator.read_and_reset().0, dec("8000"));
    }
}
