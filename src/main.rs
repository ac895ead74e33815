use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use expo::Result;
use expo::backend::{HttpBackend, OrderBackend};
use expo::config::{AppConfig, SyncSettings, fetch_config};
use expo::coordinator::OrderTracker;
use expo::models::OrderId;
use expo::sync::{OrderActions, OrderFeed, ViewOptions};
use expo::tls::build_tls_config;
use expo::tui::event::{spawn_event_reader, spawn_tick_timer, update};
use expo::tui::terminal::ring_bell;
use expo::tui::{self, Action, App, Event, Message, Screen, Tui};
use expo::websocket::WsDialer;

/// UI refresh cadence; drives banner expiry and elapsed-time labels.
const TICK_MS: u64 = 250;

#[derive(Parser)]
#[command(name = "expo")]
#[command(about = "Live order displays for restaurant staff", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Kitchen board: active orders in Incoming, Preparing and Ready lanes
    Kitchen {
        /// Restaurant whose orders to show
        #[arg(long)]
        restaurant: String,
    },

    /// Online orders panel: delivery and marketplace orders with totals
    Online {
        /// Restaurant whose orders to show
        #[arg(long)]
        restaurant: String,
    },

    /// Follow one order until it is completed or cancelled
    Track {
        /// Order id
        #[arg(long)]
        order: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = fetch_config()?;
    init_tracing(&config.log_file)?;

    let tls = match &config.backend.ca_cert {
        Some(path) => Some(build_tls_config(path)?),
        None => None,
    };
    let backend: Arc<dyn OrderBackend> =
        Arc::new(HttpBackend::new(config.backend.api_url.clone(), tls.clone())?);
    let settings = SyncSettings::default();

    let mut terminal = tui::setup_terminal()?;
    let result = match cli.cmd {
        Commands::Kitchen { restaurant } => {
            let board = Board::new(&config, backend, tls, &settings);
            board
                .run(&mut terminal, Screen::Kitchen, &restaurant, ViewOptions::kitchen())
                .await
        }
        Commands::Online { restaurant } => {
            let board = Board::new(&config, backend, tls, &settings);
            board
                .run(&mut terminal, Screen::Online, &restaurant, ViewOptions::online_panel())
                .await
        }
        Commands::Track { order } => run_tracker(&mut terminal, backend, &settings, &order).await,
    };

    // Restore the terminal even when the display failed.
    let restored = tui::restore_terminal(&mut terminal);
    if let Err(e) = &result {
        error!(error = %e, "Display exited with an error");
    }
    result?;
    restored
}

/// Logs go to a file; stdout belongs to the TUI.
fn init_tracing(log_file: &Path) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Everything an aggregate display needs to subscribe.
struct Board {
    feed: OrderFeed<WsDialer>,
    settings: SyncSettings,
}

impl Board {
    fn new(
        config: &AppConfig,
        backend: Arc<dyn OrderBackend>,
        tls: Option<rustls::ClientConfig>,
        settings: &SyncSettings,
    ) -> Self {
        let dialer = Arc::new(WsDialer::new(
            config.backend.websocket_url.clone(),
            tls.map(Arc::new),
        ));
        Self {
            feed: OrderFeed::new(dialer, backend, settings.clone(), config.backend.fetch_limit),
            settings: settings.clone(),
        }
    }

    async fn run(
        mut self,
        terminal: &mut Tui,
        screen: Screen,
        restaurant: &str,
        options: ViewOptions,
    ) -> Result<()> {
        let mut subscription = self.feed.subscribe(restaurant, options).await?;
        let actions = subscription.actions();

        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_event_reader(tx.clone());
        spawn_tick_timer(tx.clone(), TICK_MS);
        forward(subscription.view(), tx.clone(), Message::Collection);
        forward(subscription.connection_state(), tx.clone(), Message::Connection);

        let mut app = App::new(screen, subscription.restaurant_id(), self.settings.banner_duration);
        info!(restaurant_id = subscription.restaurant_id(), screen = screen.title(), "Display started");

        let outcome: Result<()> = loop {
            if let Err(e) = draw(terminal, &mut app) {
                break Err(e);
            }
            if app.should_quit {
                break Ok(());
            }

            let message = tokio::select! {
                Some(message) = rx.recv() => message,
                Some(notice) = subscription.next_notice() => Message::Notice(notice),
                else => break Ok(()),
            };

            for action in update(&mut app, message) {
                match action {
                    Action::Advance(id) => spawn_advance(actions.clone(), id, tx.clone()),
                    Action::Cancel(id) => spawn_cancel(actions.clone(), id, tx.clone()),
                    Action::Acknowledge(id) => actions.acknowledge_new(&id),
                    Action::Reconnect => subscription.reconnect(),
                    Action::Refresh => subscription.refresh(),
                }
            }
        };

        subscription.shutdown().await;
        info!("Display stopped");
        outcome
    }
}

async fn run_tracker(
    terminal: &mut Tui,
    backend: Arc<dyn OrderBackend>,
    settings: &SyncSettings,
    order_id: &str,
) -> Result<()> {
    let mut tracker = OrderTracker::spawn(backend, order_id, settings.tracker_poll_interval)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_event_reader(tx.clone());
    spawn_tick_timer(tx.clone(), TICK_MS);
    forward(tracker.view(), tx.clone(), Message::Tracker);

    let mut app = App::new(Screen::Tracker, tracker.order_id().to_string(), settings.banner_duration);

    loop {
        draw(terminal, &mut app)?;
        if app.should_quit {
            return Ok(());
        }

        let Some(message) = rx.recv().await else {
            return Ok(());
        };
        let tick = matches!(message, Message::Input(Event::Tick));

        for action in update(&mut app, message) {
            if action == Action::Refresh {
                tracker.refresh();
            }
        }
        if tick {
            for failure in tracker.errors() {
                update(&mut app, Message::TrackerError(failure));
            }
        }
    }
}

fn draw(terminal: &mut Tui, app: &mut App) -> Result<()> {
    terminal.draw(|frame| tui::render(frame, app))?;
    if std::mem::take(&mut app.ring_bell) {
        ring_bell(terminal)?;
    }
    Ok(())
}

/// Relays every value of a watch channel into the UI loop.
fn forward<T>(mut source: watch::Receiver<T>, tx: mpsc::UnboundedSender<Message>, wrap: fn(T) -> Message)
where
    T: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        loop {
            let value = source.borrow_and_update().clone();
            if tx.send(wrap(value)).is_err() {
                break;
            }
            if source.changed().await.is_err() {
                break;
            }
        }
    });
}

fn spawn_advance(actions: OrderActions, id: OrderId, tx: mpsc::UnboundedSender<Message>) {
    tokio::spawn(async move {
        let message = match actions.advance(&id).await {
            Ok(order) => Message::ActionSucceeded(format!(
                "Order #{} is now {}",
                order.order_number,
                order.status.as_str()
            )),
            Err(e) => Message::ActionFailed(format!("Could not update order: {e}")),
        };
        let _ = tx.send(message);
    });
}

fn spawn_cancel(actions: OrderActions, id: OrderId, tx: mpsc::UnboundedSender<Message>) {
    tokio::spawn(async move {
        let message = match actions.request_cancel(&id).await {
            Ok(()) => Message::ActionSucceeded("Order cancelled".to_string()),
            Err(e) => Message::ActionFailed(format!("Could not cancel order: {e}")),
        };
        let _ = tx.send(message);
    });
}
