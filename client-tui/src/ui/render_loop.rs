use crate::config::ClientConfig;
use crate::parser::coordinate_parser;
use crate::session::LocalSession;
use crate::ui::app::App;
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use keyboard_move::{attach_parser, LoadError};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;

pub async fn run_app(config: ClientConfig) -> anyhow::Result<()> {
    let session = LocalSession::from_config(&config)?;
    let mut app = App::new(session);

    // Everything shares Rc state, so the parser loads on the same thread.
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            let ctrl = app.ctrl().clone();
            let input = app.input().clone();
            tokio::task::spawn_local(async move {
                let loader = async {
                    tokio::task::yield_now().await;
                    Ok::<_, LoadError>(coordinate_parser)
                };
                if let Err(e) = attach_parser(&ctrl, input, loader).await {
                    tracing::error!("Keyboard move input unavailable: {}", e);
                }
            });

            // Setup terminal
            enable_raw_mode()?;
            let mut stdout = io::stdout();
            execute!(stdout, EnterAlternateScreen)?;
            let backend = CrosstermBackend::new(stdout);
            let mut terminal = Terminal::new(backend)?;

            let result = run_ui_loop(&mut terminal, &mut app).await;

            // Restore terminal
            disable_raw_mode()?;
            execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
            terminal.show_cursor()?;

            result
        })
        .await
}

async fn run_ui_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> anyhow::Result<()> {
    let mut term_events = EventStream::new();

    // Clock refresh; key presses wake the loop immediately via select!.
    let mut ui_tick = tokio::time::interval(Duration::from_millis(100));

    loop {
        if app.take_dirty() {
            terminal.draw(|f| app.draw(f))?;
        }

        tokio::select! {
            biased;

            maybe_event = term_events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => app.handle_key(key),
                    Some(Ok(Event::Resize(..))) => app.mark_dirty(),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => tracing::warn!("Terminal event error: {}", e),
                    None => break,
                }
            }

            _ = ui_tick.tick() => app.tick(),
        }

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}
