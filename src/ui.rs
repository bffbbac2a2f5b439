use std::cell::Cell;
use std::collections::HashMap;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use textwrap::{wrap, Options as WrapOptions};
use unicode_width::UnicodeWidthStr;

use crate::controller::FeedController;
use crate::photo::{Decoder, Slot, Thumbnail};
use crate::view::{self, ComposerView, PostView, ProfileView, WallView};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SIDEBAR_WIDTH: u16 = 30;
const COMPOSER_HEIGHT: u16 = 9;
const PROFILE_PHOTO_COLS: u16 = 24;
const PROFILE_PHOTO_ROWS: u16 = 12;
const POST_PHOTO_COLS: u16 = 30;
const POST_PHOTO_ROWS: u16 = 10;
const THUMBNAIL_CACHE_MAX: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Profile,
    Composer,
    Posts,
}

impl Pane {
    fn title(self) -> &'static str {
        match self {
            Pane::Profile => "Profile",
            Pane::Composer => "Share",
            Pane::Posts => "Wall",
        }
    }

    fn next(self) -> Self {
        match self {
            Pane::Profile => Pane::Composer,
            Pane::Composer => Pane::Posts,
            Pane::Posts => Pane::Profile,
        }
    }

    fn previous(self) -> Self {
        match self {
            Pane::Profile => Pane::Posts,
            Pane::Composer => Pane::Profile,
            Pane::Posts => Pane::Composer,
        }
    }
}

/// Path entry standing in for a file picker.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathPrompt {
    slot: Slot,
    input: String,
}

impl PathPrompt {
    fn new(slot: Slot) -> Self {
        Self {
            slot,
            input: String::new(),
        }
    }

    fn title(&self) -> &'static str {
        match self.slot {
            Slot::Draft => "Add photo to post",
            Slot::Profile => "Upload profile photo",
        }
    }

    fn insert_char(&mut self, ch: char) {
        self.input.push(ch);
    }

    fn backspace(&mut self) {
        self.input.pop();
    }

    fn resolved_path(&self) -> Option<PathBuf> {
        expand_home(self.input.trim())
    }
}

fn expand_home(raw: &str) -> Option<PathBuf> {
    if raw.is_empty() {
        return None;
    }
    if raw == "~" {
        return dirs::home_dir();
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        return dirs::home_dir().map(|home| home.join(rest));
    }
    Some(PathBuf::from(raw))
}

/// What a cached thumbnail belongs to. Post photos never change, so the id
/// is enough; the profile entry is dropped whenever a new photo lands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ThumbKey {
    Profile,
    Post(String),
}

/// Decoded thumbnails keyed by owner and target size. Failed decodes are
/// remembered so they are not retried every frame.
#[derive(Default)]
struct ThumbnailCache {
    entries: HashMap<(ThumbKey, u16, u16), Option<Thumbnail>>,
}

impl ThumbnailCache {
    fn get(&mut self, owner: ThumbKey, uri: &str, cols: u16, rows: u16) -> Option<&Thumbnail> {
        if self.entries.len() >= THUMBNAIL_CACHE_MAX {
            self.entries.clear();
        }
        self.entries
            .entry((owner, cols, rows))
            .or_insert_with(|| match Thumbnail::from_data_uri(uri, cols, rows) {
                Ok(thumb) => Some(thumb),
                Err(err) => {
                    tracing::warn!(error = %err, "thumbnail unavailable");
                    None
                }
            })
            .as_ref()
    }

    fn forget_profile(&mut self) {
        self.entries.retain(|(owner, _, _), _| *owner != ThumbKey::Profile);
    }
}

fn thumbnail_lines(thumb: &Thumbnail) -> Vec<Line<'static>> {
    (0..thumb.rows)
        .map(|row| {
            let spans: Vec<Span<'static>> = (0..thumb.cols)
                .filter_map(|col| thumb.cell(col, row))
                .map(|(top, bottom)| {
                    Span::styled(
                        "▀",
                        Style::default()
                            .fg(Color::Rgb(top[0], top[1], top[2]))
                            .bg(Color::Rgb(bottom[0], bottom[1], bottom[2])),
                    )
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

fn wrap_plain(text: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        if paragraph.trim().is_empty() {
            lines.push(Line::from(Span::styled(String::new(), style)));
            continue;
        }
        let options = WrapOptions::new(width).break_words(true);
        for cow in wrap(paragraph, options) {
            lines.push(Line::from(Span::styled(cow.into_owned(), style)));
        }
    }
    lines
}

fn right_aligned(text: &str, width: usize, style: Style) -> Line<'static> {
    let used = UnicodeWidthStr::width(text);
    let pad = width.saturating_sub(used);
    Line::from(vec![
        Span::raw(" ".repeat(pad)),
        Span::styled(text.to_string(), style),
    ])
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let height = height.min(area.height);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

pub struct Options {
    pub controller: FeedController,
    pub decoder: Decoder,
    pub tick_rate: Duration,
    pub status_message: String,
}

pub struct Model {
    controller: FeedController,
    decoder: Decoder,
    tick_rate: Duration,
    focused_pane: Pane,
    prompt: Option<PathPrompt>,
    status_message: String,
    status_is_error: bool,
    selected_post: usize,
    post_scroll: Cell<u16>,
    thumbnails: ThumbnailCache,
    needs_redraw: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        Self {
            controller: opts.controller,
            decoder: opts.decoder,
            tick_rate: opts.tick_rate,
            focused_pane: Pane::Composer,
            prompt: None,
            status_message: opts.status_message,
            status_is_error: false,
            selected_post: 0,
            post_scroll: Cell::new(0),
            thumbnails: ThumbnailCache::default(),
            needs_redraw: true,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            if event::poll(self.tick_rate)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key)? {
                            break;
                        }
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status_message = message.into();
        self.status_is_error = false;
    }

    fn set_error<S: Into<String>>(&mut self, message: S) {
        self.status_message = message.into();
        self.status_is_error = true;
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Some(result) = self.decoder.try_recv() {
            let slot = result.slot;
            match self.controller.apply_decoded(result) {
                Ok(true) => {
                    changed = true;
                    match slot {
                        Slot::Draft => self.set_status("Photo attached to your post."),
                        Slot::Profile => {
                            self.thumbnails.forget_profile();
                            self.set_status("Profile photo updated.");
                        }
                    }
                }
                Ok(false) => {}
                Err(err) => {
                    changed = true;
                    self.set_error(format!("Photo not loaded: {err}"));
                }
            }
        }
        changed
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }

        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            self.mark_dirty();
            return Ok(false);
        }

        match key.code {
            KeyCode::Tab => {
                self.focus(self.focused_pane.next());
                return Ok(false);
            }
            KeyCode::BackTab => {
                self.focus(self.focused_pane.previous());
                return Ok(false);
            }
            _ => {}
        }

        let quit = match self.focused_pane {
            Pane::Composer => {
                self.handle_composer_key(key);
                false
            }
            Pane::Posts => self.handle_posts_key(key),
            Pane::Profile => self.handle_profile_key(key),
        };
        self.mark_dirty();
        Ok(quit)
    }

    fn focus(&mut self, pane: Pane) {
        self.focused_pane = pane;
        self.set_status(match pane {
            Pane::Profile => "Profile: p to upload a photo.",
            Pane::Composer => "Type a message, Enter to share.",
            Pane::Posts => "Browsing your wall.",
        });
        self.mark_dirty();
    }

    fn open_prompt(&mut self, slot: Slot) {
        self.prompt = Some(PathPrompt::new(slot));
        self.set_status("Enter the path of an image file.");
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.prompt = None;
                self.set_status("Photo selection cancelled.");
            }
            KeyCode::Enter => {
                let slot = prompt.slot;
                let Some(path) = prompt.resolved_path() else {
                    return;
                };
                self.prompt = None;
                let generation = self.controller.begin_decode(slot);
                tracing::debug!(?slot, generation, path = %path.display(), "photo requested");
                self.decoder.request(slot, generation, path);
                self.set_status("Loading photo…");
            }
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Char(ch) => prompt.insert_char(ch),
            _ => {}
        }
    }

    fn handle_composer_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('o') if ctrl => self.open_prompt(Slot::Draft),
            KeyCode::Char('x') if ctrl => {
                if self.controller.draft().photo.is_some() {
                    self.controller.clear_draft_photo();
                    self.set_status("Photo removed from draft.");
                }
            }
            KeyCode::Char('u') if ctrl => {
                self.controller.set_draft_message("");
            }
            KeyCode::Enter => self.share(),
            KeyCode::Backspace => {
                self.controller.pop_draft_char();
            }
            KeyCode::Esc => self.focus(Pane::Posts),
            KeyCode::Char(ch) if !ctrl => {
                if !self.controller.push_draft_char(ch) {
                    self.set_error(format!(
                        "Posts are limited to {} characters.",
                        self.controller.limits().max_chars
                    ));
                }
            }
            _ => {}
        }
    }

    fn share(&mut self) {
        if self.controller.submit().is_some() {
            self.selected_post = 0;
            self.post_scroll.set(0);
            self.set_status("Shared to your wall.");
        }
        // focus stays on the message field for the next post
        self.focused_pane = Pane::Composer;
    }

    fn handle_posts_key(&mut self, key: KeyEvent) -> bool {
        let count = self.controller.posts().len();
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected_post + 1 < count {
                    self.selected_post += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_post = self.selected_post.saturating_sub(1);
            }
            KeyCode::Char('g') | KeyCode::Home => self.selected_post = 0,
            KeyCode::Char('G') | KeyCode::End => self.selected_post = count.saturating_sub(1),
            KeyCode::Char('i') | KeyCode::Enter => self.focus(Pane::Composer),
            KeyCode::Char('p') => self.open_prompt(Slot::Profile),
            _ => {}
        }
        false
    }

    fn handle_profile_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('p') | KeyCode::Enter => self.open_prompt(Slot::Profile),
            KeyCode::Char('i') => self.focus(Pane::Composer),
            _ => {}
        }
        false
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(full);

        let header = Paragraph::new(" Wall").style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_BORDER_FOCUSED)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(header, layout[0]);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(layout[1]);
        let main = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(COMPOSER_HEIGHT), Constraint::Min(0)])
            .split(columns[1]);

        let wall = view::project(&self.controller, Utc::now());
        let focused = self.focused_pane;
        draw_profile(
            frame,
            columns[0],
            &wall.profile,
            &mut self.thumbnails,
            focused == Pane::Profile,
        );
        draw_composer(frame, main[0], &wall.composer, focused == Pane::Composer);
        draw_posts(
            frame,
            main[1],
            &wall,
            &mut self.thumbnails,
            PostsState {
                focused: focused == Pane::Posts,
                selected: self.selected_post,
                scroll: &self.post_scroll,
            },
        );

        let status_style = if self.status_is_error {
            Style::default().fg(COLOR_ERROR).bg(COLOR_PANEL_FOCUSED_BG)
        } else {
            Style::default().fg(COLOR_TEXT_PRIMARY).bg(COLOR_PANEL_FOCUSED_BG)
        };
        frame.render_widget(
            Paragraph::new(self.status_message.clone()).style(status_style),
            layout[2],
        );

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[3]);

        if let Some(prompt) = &self.prompt {
            draw_prompt(frame, layout[1], prompt);
        }
    }

    fn footer_text(&self) -> String {
        if self.prompt.is_some() {
            return "Type a file path · ~ expands to home · Enter load · Esc cancel".to_string();
        }

        let mut parts: Vec<&str> = Vec::new();
        match self.focused_pane {
            Pane::Composer => {
                parts.push("Enter share");
                parts.push("Ctrl-O add photo");
                if self.controller.draft().photo.is_some() {
                    parts.push("Ctrl-X remove photo");
                }
                parts.push("Ctrl-U clear");
                parts.push("Esc browse wall");
            }
            Pane::Posts => {
                if self.controller.posts().is_empty() {
                    parts.push("No posts yet");
                } else {
                    parts.push("j/k move, g/G top/bottom");
                }
                parts.push("i write");
                parts.push("p profile photo");
                parts.push("q quit");
            }
            Pane::Profile => {
                parts.push("p upload profile photo");
                parts.push("i write");
                parts.push("q quit");
            }
        }
        parts.push("Tab switch pane");
        parts.push("Ctrl-C quit");
        parts.join(" · ")
    }
}

fn pane_block(pane: Pane, focused: bool) -> Block<'static> {
    let border_style = if focused {
        Style::default().fg(COLOR_BORDER_FOCUSED)
    } else {
        Style::default().fg(COLOR_BORDER_IDLE)
    };
    let title_style = if focused {
        Style::default()
            .fg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(COLOR_TEXT_SECONDARY)
    };
    Block::default()
        .title(Span::styled(pane.title(), title_style))
        .borders(Borders::ALL)
        .border_style(border_style)
        .style(Style::default().bg(COLOR_PANEL_BG))
        .padding(Padding::horizontal(1))
}

fn draw_profile(
    frame: &mut Frame<'_>,
    area: Rect,
    profile: &ProfileView<'_>,
    thumbnails: &mut ThumbnailCache,
    focused: bool,
) {
    let block = pane_block(Pane::Profile, focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let primary = Style::default().fg(COLOR_TEXT_PRIMARY);
    let secondary = Style::default().fg(COLOR_TEXT_SECONDARY);
    let bold = primary.add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line<'static>> = Vec::new();

    let photo = match profile.photo {
        Some(uri) => thumbnails.get(
            ThumbKey::Profile,
            uri,
            PROFILE_PHOTO_COLS.min(inner.width.max(1)),
            PROFILE_PHOTO_ROWS,
        ),
        None => None,
    };
    match photo {
        Some(thumb) => {
            lines.extend(thumbnail_lines(thumb));
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(profile.name.to_string(), bold)));
            lines.push(Line::from(Span::styled(profile.subtitle, secondary)));
        }
        None => {
            let badge = Style::default()
                .fg(COLOR_TEXT_SECONDARY)
                .bg(COLOR_PANEL_SELECTED_BG)
                .add_modifier(Modifier::BOLD);
            let label = format!("  {}  ", profile.initials);
            let blank = " ".repeat(UnicodeWidthStr::width(label.as_str()));
            lines.push(Line::from(Span::styled(blank.clone(), badge)));
            lines.push(Line::from(vec![
                Span::styled(label, badge),
                Span::raw("  "),
                Span::styled(profile.name.to_string(), bold),
            ]));
            lines.push(Line::from(vec![
                Span::styled(blank, badge),
                Span::raw("  "),
                Span::styled(profile.subtitle, secondary),
            ]));
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                "[p] upload photo",
                Style::default().fg(COLOR_ACCENT),
            )));
        }
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        " Information ",
        Style::default()
            .fg(COLOR_TEXT_PRIMARY)
            .bg(COLOR_PANEL_FOCUSED_BG),
    )));
    lines.push(Line::default());
    lines.push(Line::from(Span::styled("Networks", bold)));
    lines.push(Line::from(Span::styled(profile.networks.to_string(), primary)));
    lines.push(Line::default());
    lines.push(Line::from(Span::styled("Current City", bold)));
    lines.push(Line::from(Span::styled(
        profile.current_city.to_string(),
        primary,
    )));

    frame.render_widget(Paragraph::new(Text::from(lines)), inner);
}

fn draw_composer(frame: &mut Frame<'_>, area: Rect, composer: &ComposerView<'_>, focused: bool) {
    let block = pane_block(Pane::Composer, focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let input = if composer.message.is_empty() {
        let mut spans = vec![Span::styled(
            view::COMPOSER_PLACEHOLDER,
            Style::default()
                .fg(COLOR_TEXT_SECONDARY)
                .add_modifier(Modifier::ITALIC),
        )];
        if focused {
            spans.insert(0, Span::styled("▏", Style::default().fg(COLOR_ACCENT)));
        }
        Text::from(Line::from(spans))
    } else {
        let mut lines = wrap_plain(
            composer.message,
            chunks[0].width as usize,
            Style::default().fg(COLOR_TEXT_PRIMARY),
        );
        if focused {
            if let Some(last) = lines.last_mut() {
                last.spans
                    .push(Span::styled("▏", Style::default().fg(COLOR_ACCENT)));
            }
        }
        let overflow = lines.len().saturating_sub(chunks[0].height as usize);
        Text::from(lines.split_off(overflow))
    };
    frame.render_widget(Paragraph::new(input), chunks[0]);

    let counter = format!("{} characters remaining", composer.remaining);
    let mut meta = vec![Span::styled(
        counter,
        Style::default().fg(COLOR_TEXT_SECONDARY),
    )];
    if composer.has_photo {
        meta.push(Span::raw("  "));
        meta.push(Span::styled(
            "[photo attached]",
            Style::default().fg(COLOR_SUCCESS),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(meta)), chunks[1]);

    let share_style = if composer.can_submit {
        Style::default()
            .fg(COLOR_BG)
            .bg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(COLOR_TEXT_SECONDARY)
            .bg(COLOR_PANEL_FOCUSED_BG)
    };
    let share = Paragraph::new(Line::from(Span::styled(" Share ", share_style)))
        .alignment(Alignment::Right);
    frame.render_widget(share, chunks[2]);
}

struct PostsState<'a> {
    focused: bool,
    selected: usize,
    scroll: &'a Cell<u16>,
}

fn post_lines(
    post: &PostView<'_>,
    width: usize,
    selected: bool,
    thumbnails: &mut ThumbnailCache,
) -> Vec<Line<'static>> {
    let bg = if selected {
        COLOR_PANEL_SELECTED_BG
    } else {
        COLOR_PANEL_BG
    };
    let mut lines = vec![Line::from(Span::styled(
        post.name.to_string(),
        Style::default()
            .fg(COLOR_TEXT_PRIMARY)
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    ))];

    if let Some(uri) = post.photo {
        let cols = POST_PHOTO_COLS.min(width.max(1) as u16);
        let owner = ThumbKey::Post(post.id.to_string());
        match thumbnails.get(owner, uri, cols, POST_PHOTO_ROWS) {
            Some(thumb) => lines.extend(thumbnail_lines(thumb)),
            None => lines.push(Line::from(Span::styled(
                "[image unavailable]",
                Style::default().fg(COLOR_TEXT_SECONDARY).bg(bg),
            ))),
        }
    }

    lines.extend(wrap_plain(
        post.message,
        width,
        Style::default().fg(COLOR_TEXT_PRIMARY).bg(bg),
    ));
    lines.push(right_aligned(
        &post.age,
        width,
        Style::default().fg(COLOR_TEXT_SECONDARY).bg(bg),
    ));
    lines.push(Line::from(Span::styled(
        "╌".repeat(width),
        Style::default().fg(COLOR_BORDER_IDLE),
    )));
    lines
}

fn draw_posts(
    frame: &mut Frame<'_>,
    area: Rect,
    wall: &WallView<'_>,
    thumbnails: &mut ThumbnailCache,
    state: PostsState<'_>,
) {
    let block = pane_block(Pane::Posts, state.focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(placeholder) = wall.empty_placeholder() {
        let empty = Paragraph::new(Text::from(vec![
            Line::default(),
            Line::from(Span::styled(
                placeholder,
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    let width = inner.width.max(1) as usize;
    let selected = state.selected.min(wall.posts.len().saturating_sub(1));
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut selected_span = (0usize, 0usize);
    for (idx, post) in wall.posts.iter().enumerate() {
        let start = lines.len();
        let is_selected = state.focused && idx == selected;
        lines.extend(post_lines(post, width, is_selected, thumbnails));
        if idx == selected {
            selected_span = (start, lines.len());
        }
    }

    let height = inner.height as usize;
    let scroll = keep_visible(state.scroll.get() as usize, selected_span, height);
    state.scroll.set(scroll.min(u16::MAX as usize) as u16);

    frame.render_widget(
        Paragraph::new(Text::from(lines)).scroll((state.scroll.get(), 0)),
        inner,
    );
}

/// Adjusts a scroll offset so the half-open line range `span` is on screen,
/// preferring its top edge when it is taller than the view.
fn keep_visible(scroll: usize, span: (usize, usize), height: usize) -> usize {
    let (start, end) = span;
    if height == 0 || start < scroll {
        return start;
    }
    if end > scroll + height {
        return end.saturating_sub(height).min(start);
    }
    scroll
}

fn draw_prompt(frame: &mut Frame<'_>, area: Rect, prompt: &PathPrompt) {
    let popup = centered_rect(70, 5, area);
    frame.render_widget(Clear, popup);
    let body = Paragraph::new(Line::from(vec![
        Span::styled(prompt.input.clone(), Style::default().fg(COLOR_TEXT_PRIMARY)),
        Span::styled("▏", Style::default().fg(COLOR_ACCENT)),
    ]))
    .block(
        Block::default()
            .title(Span::styled(
                prompt.title(),
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_ACCENT))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::uniform(1)),
    );
    frame.render_widget(body, popup);
}
