use anyhow::{Context, Result};
use btw_mode_config::Config;
use btw_mode_engine::{HeadingDecorator, OutlineEntry, Sources, Viewer, io};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{info, warn};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use relative_path::{RelativePath, RelativePathBuf};
use std::{
    env,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
};

struct App {
    data_path: PathBuf,
    config: Option<Config>,
    articles: Vec<RelativePathBuf>,
    article_list_state: ListState,
    current_content: Vec<Line<'static>>,
}

impl App {
    fn new(data_path: PathBuf, config: Option<Config>) -> Result<Self> {
        let articles = io::scan_xml_files(&data_path)?
            .into_iter()
            .filter_map(|p| {
                p.strip_prefix(&data_path)
                    .ok()
                    .and_then(|r| RelativePathBuf::from_path(r).ok())
            })
            .collect();

        let mut app = Self {
            data_path,
            config,
            articles,
            article_list_state: ListState::default(),
            current_content: Vec::new(),
        };

        // Select first article if available
        if !app.articles.is_empty() {
            app.article_list_state.select(Some(0));
            app.update_content_for_selection();
        }

        Ok(app)
    }

    fn next_article(&mut self) {
        if self.articles.is_empty() {
            return;
        }
        let i = match self.article_list_state.selected() {
            Some(i) => (i + 1) % self.articles.len(),
            None => 0,
        };
        self.article_list_state.select(Some(i));
        self.update_content_for_selection();
    }

    fn previous_article(&mut self) {
        if self.articles.is_empty() {
            return;
        }
        let i = match self.article_list_state.selected() {
            Some(0) | None => self.articles.len() - 1,
            Some(i) => i - 1,
        };
        self.article_list_state.select(Some(i));
        self.update_content_for_selection();
    }

    fn update_content_for_selection(&mut self) {
        let Some(article) = self
            .article_list_state
            .selected()
            .and_then(|i| self.articles.get(i))
        else {
            return;
        };
        self.current_content = match render_outline(article, &self.data_path, self.config.as_ref())
        {
            Ok(outline) => outline_lines(&outline),
            Err(e) => vec![Line::from(format!("Error rendering article: {e:#}"))],
        };
    }
}

/// Load and render one article with the viewer
fn render_outline(
    article: &RelativePath,
    data_path: &Path,
    config: Option<&Config>,
) -> Result<Vec<OutlineEntry>> {
    let tree = io::read_document(article, data_path)
        .with_context(|| format!("reading {article}"))?;
    let mut viewer = match config {
        Some(config) => Viewer::with_headings(tree, config.sources(), viewer_headings(config)?),
        None => Viewer::new(tree, Sources::default()),
    };
    viewer.render()?;
    info!("rendered {article}");
    Ok(viewer.outline())
}

fn viewer_headings(config: &Config) -> Result<HeadingDecorator> {
    let mut headings = HeadingDecorator::viewer();
    for spec in config.heading_specs()? {
        headings.add_spec(spec);
    }
    Ok(headings)
}

fn outline_lines(outline: &[OutlineEntry]) -> Vec<Line<'static>> {
    outline
        .iter()
        .map(|entry| {
            let indent = "  ".repeat(entry.depth);
            let mut spans = vec![Span::raw(indent)];
            match (&entry.heading, &entry.text) {
                (Some(heading), _) => spans.push(Span::styled(
                    heading.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                (None, Some(text)) => spans.push(Span::raw(text.clone())),
                (None, None) => spans.push(Span::styled(
                    entry.kind.clone(),
                    Style::default().fg(Color::DarkGray),
                )),
            }
            if let Some(id) = &entry.id {
                spans.push(Span::styled(
                    format!("  #{id}"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            Line::from(spans)
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("ignoring config file: {e}");
            None
        }
    };

    // Non-interactive: print one article's outline as JSON
    if args.len() == 3 && args[1] == "--outline" {
        let path = PathBuf::from(&args[2]);
        let data_path = path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("article path has no file name")?;
        let outline = render_outline(RelativePath::new(file_name), &data_path, config.as_ref())?;
        println!("{}", serde_json::to_string_pretty(&outline)?);
        return Ok(());
    }

    let data_path;
    let from_config;

    if args.len() == 2 {
        // CLI argument provided - use it
        data_path = PathBuf::from(&args[1]);
        from_config = false;
    } else if args.len() == 1 {
        match &config {
            Some(config) => {
                data_path = config.data_path.clone();
                from_config = true;
            }
            None => {
                eprintln!("Error: No data path provided and no config file found");
                eprintln!("Usage: {} <articles-folder-path>", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
        }
    } else {
        eprintln!("Usage: {} [articles-folder-path]", args[0]);
        eprintln!("       {} --outline <article.xml>", args[0]);
        process::exit(1);
    };

    // Validate data directory using engine
    if let Err(e) = io::validate_data_dir(&data_path) {
        let source = if from_config {
            format!(" from config file '{}'", config_path.display())
        } else {
            String::new()
        };
        eprintln!(
            "Error: Data path '{}'{} is invalid: {e}",
            data_path.display(),
            source
        );
        process::exit(1);
    }

    // Create app before touching the terminal so load errors stay readable
    let mut app = App::new(data_path, config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next_article(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_article(),
                KeyCode::Char('r') => app.update_content_for_selection(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)].as_ref())
        .split(f.area());

    // Article list panel
    let article_items: Vec<ListItem> = app
        .articles
        .iter()
        .map(|article| ListItem::new(vec![Line::from(vec![Span::raw(article.to_string())])]))
        .collect();

    let article_list = List::new(article_items)
        .block(Block::default().borders(Borders::ALL).title("Articles"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));

    f.render_stateful_widget(article_list, chunks[0], &mut app.article_list_state);

    // Outline panel
    let content_text = if app.current_content.is_empty() {
        vec![Line::from("Select an article to view its outline")]
    } else {
        app.current_content.clone()
    };

    let content = Paragraph::new(content_text)
        .block(Block::default().borders(Borders::ALL).title("Outline"))
        .wrap(ratatui::widgets::Wrap { trim: false });

    f.render_widget(content, chunks[1]);

    // Instructions
    let help_text = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("↑/k: Previous | "),
        Span::raw("↓/j: Next | "),
        Span::raw("r: Reload"),
    ]);

    let help = Paragraph::new(vec![help_text]).block(Block::default());

    // Place help at bottom
    let bottom_chunk = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.area());

    f.render_widget(help, bottom_chunk[1]);
}
