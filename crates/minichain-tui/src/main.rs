//! Terminal UI for the proof-of-work ledger.
use std::{io, time::Duration};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use minichain_core::{ledger::Ledger, pow, CandidateBlock, Entry};
use ratatui::{
    layout::{Constraint, Direction, Flex, Layout, Rect},
    prelude::*,
    widgets::*,
    Frame,
};
use sha2::{Digest, Sha256};
use tracing_subscriber::{fmt, EnvFilter};

// The core imposes no upper bound on difficulty; the UI does.
const DIFFICULTY_MIN: usize = 1;
const DIFFICULTY_MAX: usize = 5;
const DEFAULT_CREATOR_ID: u64 = 42;

#[derive(Parser, Debug, Clone)]
struct Args {
    /// Mining difficulty to start with (leading zero hex digits, 1-5)
    #[arg(short, long, default_value_t = 2)]
    difficulty: usize,

    /// Creator id recorded on blocks mined from this session
    #[arg(long, default_value_t = DEFAULT_CREATOR_ID)]
    creator: u64,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    #[default]
    Dashboard,
    Chain,
    Add,
    Validate,
    HashDemo,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
enum AddField {
    #[default]
    Sender,
    Receiver,
    Amount,
}

#[derive(Debug)]
struct App {
    args: Args,
    ledger: Ledger,
    tab: Tab,
    // chain table
    chain_cursor: usize,
    chain_state: TableState,
    chain_scroll: ScrollbarState,
    chain_popup: bool,
    // add form
    add_field: AddField,
    add_sender: String,
    add_receiver: String,
    add_amount: String,
    add_status: Option<String>,
    // validation
    validate_status: Option<String>,
    // hash demo
    hash_input: String,
    hash_output: String,
    hash_zero_digits: usize,
}

// Each item in the chain table is 1 row high
const ITEM_HEIGHT: usize = 1;

impl App {
    /// The ledger is owned by the caller and injected here; the UI never
    /// holds more than this one instance.
    fn new(args: Args, ledger: Ledger) -> Self {
        Self {
            args,
            ledger,
            tab: Tab::Dashboard,
            chain_cursor: 0,
            chain_state: TableState::default(),
            chain_scroll: ScrollbarState::default(),
            chain_popup: false,
            add_field: AddField::Sender,
            add_sender: "alice".into(),
            add_receiver: "bob".into(),
            add_amount: "10".into(),
            add_status: None,
            validate_status: None,
            hash_input: String::new(),
            hash_output: String::new(),
            hash_zero_digits: 0,
        }
    }

    fn next_row(&mut self) {
        let len = self.ledger.height();
        let i = match self.chain_state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    self.chain_cursor = 0;
                    0
                } else {
                    self.chain_cursor += 1;
                    i + 1
                }
            }
            None => 0,
        };
        self.chain_state.select(Some(i));
        self.chain_scroll = self.chain_scroll.position(i * ITEM_HEIGHT);
    }

    fn previous_row(&mut self) {
        let len = self.ledger.height();
        let i = match self.chain_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.chain_cursor = len - 1;
                    len - 1
                } else {
                    self.chain_cursor -= 1;
                    i - 1
                }
            }
            None => 0,
        };
        self.chain_state.select(Some(i));
        self.chain_scroll = self.chain_scroll.position(i * ITEM_HEIGHT);
    }

    fn next_field(&mut self) {
        self.add_field = match self.add_field {
            AddField::Sender => AddField::Receiver,
            AddField::Receiver => AddField::Amount,
            AddField::Amount => AddField::Sender,
        };
    }

    fn previous_field(&mut self) {
        self.add_field = match self.add_field {
            AddField::Sender => AddField::Amount,
            AddField::Receiver => AddField::Sender,
            AddField::Amount => AddField::Receiver,
        };
    }

    fn active_add_field(&mut self) -> &mut String {
        match self.add_field {
            AddField::Sender => &mut self.add_sender,
            AddField::Receiver => &mut self.add_receiver,
            AddField::Amount => &mut self.add_amount,
        }
    }

    /// Build an entry from the form, link it to the current tip and hand it
    /// to the ledger. Mining runs right here; at the UI's difficulty bounds
    /// the search returns well under a second.
    fn add_block(&mut self) {
        let entry = Entry::from_input(&self.add_sender, &self.add_receiver, &self.add_amount);
        let candidate = CandidateBlock::new(entry, self.args.creator, self.ledger.tip_hash());
        self.ledger.add(candidate);
        let tip = self.ledger.tip();
        self.add_status = Some(format!(
            "✅ Mined block {} nonce={} hash={}",
            self.ledger.height() - 1,
            tip.nonce,
            tip.hash()
        ));
    }

    fn run_validation(&mut self) {
        self.validate_status = Some(if self.ledger.validate() {
            "✅ Chain is valid".into()
        } else {
            "❌ Chain is INVALID: a stored prev-hash no longer matches its predecessor".into()
        });
    }

    fn raise_difficulty(&mut self) {
        let d = self.ledger.difficulty();
        if d < DIFFICULTY_MAX {
            self.ledger.set_difficulty(d + 1);
        }
    }

    fn lower_difficulty(&mut self) {
        let d = self.ledger.difficulty();
        if d > DIFFICULTY_MIN {
            self.ledger.set_difficulty(d - 1);
        }
    }

    fn update_hash_demo(&mut self) {
        let digest = Sha256::digest(self.hash_input.as_bytes());
        self.hash_output = hex::encode(digest);
        self.hash_zero_digits = pow::leading_zero_digits(&self.hash_output);
    }
}

fn main() -> Result<()> {
    // tracing
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();
    // terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let ledger = Ledger::new(args.difficulty.clamp(DIFFICULTY_MIN, DIFFICULTY_MAX));
    let mut app = App::new(args.clone(), ledger);
    app.update_hash_demo();

    let res = run_app(&mut terminal, &mut app);

    // restore
    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if crossterm::event::poll(Duration::from_millis(200))? {
            if let CEvent::Key(key) = event::read()? {
                if handle_key(app, key)? {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => return Ok(true),
        KeyCode::Esc => return Ok(true),
        KeyCode::Tab => {
            app.tab = match app.tab {
                Tab::Dashboard => Tab::Chain,
                Tab::Chain => Tab::Add,
                Tab::Add => Tab::Validate,
                Tab::Validate => Tab::HashDemo,
                Tab::HashDemo => Tab::Dashboard,
            };
        }
        KeyCode::BackTab => {
            app.tab = match app.tab {
                Tab::Dashboard => Tab::HashDemo,
                Tab::Chain => Tab::Dashboard,
                Tab::Add => Tab::Chain,
                Tab::Validate => Tab::Add,
                Tab::HashDemo => Tab::Validate,
            };
        }
        _ => match app.tab {
            Tab::Chain => match key.code {
                KeyCode::Down => app.next_row(),
                KeyCode::Up => app.previous_row(),
                KeyCode::Char('p') => app.chain_popup = !app.chain_popup,
                _ => {}
            },
            Tab::Add => match key.code {
                KeyCode::Down => app.next_field(),
                KeyCode::Up => app.previous_field(),
                KeyCode::Left => app.lower_difficulty(),
                KeyCode::Right => app.raise_difficulty(),
                KeyCode::Enter => app.add_block(),
                KeyCode::Backspace => {
                    app.active_add_field().pop();
                }
                KeyCode::Char(c) if !c.is_control() => app.active_add_field().push(c),
                _ => {}
            },
            Tab::Validate => {
                if key.code == KeyCode::Enter {
                    app.run_validation();
                }
            }
            Tab::HashDemo => match key.code {
                KeyCode::Char(c) if !c.is_control() => {
                    app.hash_input.push(c);
                    app.update_hash_demo();
                }
                KeyCode::Backspace => {
                    app.hash_input.pop();
                    app.update_hash_demo();
                }
                _ => {}
            },
            Tab::Dashboard => {}
        },
    }
    Ok(false)
}

fn ui(f: &mut Frame, app: &mut App) {
    let size = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(size);

    // Tabs
    let titles = ["Dashboard", "Chain", "Add", "Validate", "HashDemo"]
        .iter()
        .map(|t| Line::from(*t))
        .collect::<Vec<_>>();
    let tabs = Tabs::new(titles)
        .select(app.tab as usize)
        .block(Block::default().borders(Borders::ALL).title("minichain-tui"))
        .style(Style::default().fg(Color::Green))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    // Main area
    match app.tab {
        Tab::Dashboard => render_dashboard(f, chunks[1], app),
        Tab::Chain => render_chain(f, chunks[1], app),
        Tab::Add => render_add(f, chunks[1], app),
        Tab::Validate => render_validate(f, chunks[1], app),
        Tab::HashDemo => render_hashdemo(f, chunks[1], app),
    }

    // Footer
    let help = Paragraph::new(
        "ESC quit • TAB prev/next tab • Chain: ↑/↓ select, p inspect • Add: ↑/↓ field, ←/→ difficulty, Enter mine • Validate: Enter • HashDemo: type to hash")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL).title("help"));
    f.render_widget(help, chunks[2]);
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let lines = vec![
        Line::from(format!("Blocks     : {}", app.ledger.height())),
        Line::from(format!("Tip hash   : {}", app.ledger.tip_hash())),
        Line::from(format!("Difficulty : {}", app.ledger.difficulty())),
        Line::from(format!("Creator id : {}", app.args.creator)),
    ];
    let dash =
        Paragraph::new(lines).block(Block::default().title("Overview").borders(Borders::ALL));
    f.render_widget(dash, chunks[0]);

    let about = Paragraph::new(vec![
        Line::from("minichain-tui"),
        Line::from("• Append-only hash-linked ledger, one block per entry"),
        Line::from("• Proof-of-work gate: hashes must start with N zero hex digits"),
        Line::from("• Validate re-walks every stored link on demand"),
        Line::from("• Live SHA-256 hash demo"),
    ])
    .block(Block::default().title("About").borders(Borders::ALL));
    f.render_widget(about, chunks[1]);
}

fn render_chain(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.ledger.blocks().iter().enumerate().map(|(i, b)| {
        Row::new(vec![
            Cell::from(i.to_string()),
            Cell::from(b.timestamp.clone()),
            Cell::from(b.nonce.to_string()),
            Cell::from(b.entry.sender.clone()),
            Cell::from(b.entry.receiver.clone()),
            Cell::from(b.entry.amount.to_string()),
            Cell::from(b.creator_id.to_string()),
            Cell::from(b.hash()),
            Cell::from(b.prev_hash.clone()),
        ])
        .style(if i == app.chain_cursor {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        })
    });
    let table = Table::new(
        rows,
        vec![
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(66),
            Constraint::Length(66),
        ],
    )
    .header(
        Row::new(vec![
            "idx", "time", "nonce", "from", "to", "amount", "creator", "hash", "prev",
        ])
        .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title("Ledger blocks"));
    f.render_stateful_widget(table, area, &mut app.chain_state);

    if app.chain_popup {
        // Block inspector: full fields of the block under the cursor
        let popup = Block::bordered()
            .style(Style::default().bg(Color::Black).fg(Color::Yellow))
            .title("Block details")
            .title_style(Style::new().yellow().bold())
            .border_style(Style::new().red().bold());
        let blocks = app.ledger.blocks();
        let items = if blocks.is_empty() || app.chain_cursor >= blocks.len() {
            vec!["No block selected".to_string()]
        } else {
            let b = &blocks[app.chain_cursor];
            vec![
                format!(" Index     : {}", app.chain_cursor),
                format!(" Timestamp : {}", b.timestamp),
                format!(" Nonce     : {}", b.nonce),
                format!(" Sender    : {}", b.entry.sender),
                format!(" Receiver  : {}", b.entry.receiver),
                format!(" Amount    : {}", b.entry.amount),
                format!(" Creator   : {}", b.creator_id),
                format!(" Hash      : {}", b.hash()),
                format!(" Prev hash : {}", b.prev_hash),
            ]
        };
        let list = List::new(items).block(popup.clone());
        let popup_area = centered_area(area, 60, 30);
        // clears out any background in the area before rendering the popup
        f.render_widget(Clear, popup_area);
        f.render_widget(popup, popup_area);
        f.render_widget(list, popup_area);
    }
}

fn render_add(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Min(0),
        ])
        .split(area);

    let top = Paragraph::new(format!(
        "Difficulty: {}   (←/→ to adjust, {DIFFICULTY_MIN}-{DIFFICULTY_MAX})",
        app.ledger.difficulty()
    ))
    .block(Block::default().borders(Borders::ALL).title("Target"));
    f.render_widget(top, chunks[0]);

    let marker = |field: AddField| if app.add_field == field { ">" } else { " " };
    let form = Paragraph::new(vec![
        Line::from(format!(
            "{} Sender   : {}",
            marker(AddField::Sender),
            app.add_sender
        )),
        Line::from(format!(
            "{} Receiver : {}",
            marker(AddField::Receiver),
            app.add_receiver
        )),
        Line::from(format!(
            "{} Amount   : {}",
            marker(AddField::Amount),
            app.add_amount
        )),
        Line::from("Press <Enter> to mine this entry onto the chain"),
    ])
    .block(
        Block::default()
            .title("New entry (↑/↓ field, type, Backspace)")
            .borders(Borders::ALL),
    );
    f.render_widget(form, chunks[1]);

    let status = Paragraph::new(app.add_status.clone().unwrap_or_default())
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Status").borders(Borders::ALL));
    f.render_widget(status, chunks[2]);
}

fn render_validate(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let intro = Paragraph::new(vec![
        Line::from("Re-walks the chain and checks that every block's stored"),
        Line::from("prev-hash matches the computed hash of its predecessor."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Integrity check"));
    f.render_widget(intro, chunks[0]);

    let status = Paragraph::new(app.validate_status.clone().unwrap_or_else(|| {
        "Press <Enter> to validate the chain".to_string()
    }))
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title("Result"));
    f.render_widget(status, chunks[1]);
}

fn render_hashdemo(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Length(4),
            Constraint::Min(0),
        ])
        .split(area);

    let input = Paragraph::new(app.hash_input.clone())
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Input"));
    f.render_widget(input, chunks[0]);

    let out = Paragraph::new(format!(
        "sha256: {}\nleading zero hex digits: {}",
        app.hash_output, app.hash_zero_digits
    ))
    .block(Block::default().borders(Borders::ALL).title("Output"));
    f.render_widget(out, chunks[1]);

    let help = Paragraph::new(
        "Type to update the hash. A block is accepted once its hash carries difficulty-many leading zeros.",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[2]);
}

/// Create a centered rect using the given percentage of the available rect
fn centered_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    // vertically center a strip that's percent_y tall
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let [area] = vertical.areas(area);

    // horizontally center a strip that's percent_x wide within that strip
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = horizontal.areas(area);

    area
}
