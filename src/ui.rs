//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! Layout, top to bottom: a one-line header naming the active feed, the
//! post list next to a detail pane, and a one-line status bar.  With no feed
//! selected the list area shows a welcome message instead; after a failed
//! first page it shows the error.

use chrono::NaiveDateTime;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use wp_reader::fetcher::FilterContext;
use wp_reader::source::{Location, Post};

use crate::app::{App, ImageStatus};

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [header_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(app, frame, header_area);

    let failed = app.error.clone().filter(|_| app.items.is_empty());
    match (app.context, failed) {
        (None, _) => draw_message(frame, main_area, WELCOME, Color::Cyan),
        (Some(_), Some(err)) => {
            let text = format!("{err}\n\nPress r to retry.");
            draw_message(frame, main_area, &text, Color::Red)
        }
        (Some(_), None) => {
            let [list_area, detail_area] =
                Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
                    .areas(main_area);
            draw_post_list(app, frame, list_area);
            match app.active_location().map(location_lines) {
                Some(lines) => {
                    let [post_area, location_area] = Layout::vertical([
                        Constraint::Min(3),
                        Constraint::Length(lines.len() as u16 + 2),
                    ])
                    .areas(detail_area);
                    draw_detail(app, frame, post_area);
                    let contact = Paragraph::new(lines)
                        .block(Block::default().title(" Location ").borders(Borders::ALL));
                    frame.render_widget(contact, location_area);
                }
                None => draw_detail(app, frame, detail_area),
            }
        }
    }

    draw_status_bar(app, frame, status_area);
}

const WELCOME: &str = "Welcome!\n\nPress l to pick a location, or a for all posts.";

/// `2025-06-01T12:00:00` → `2025-06-01 12:00`; anything unparseable is
/// shown as-is.
fn format_date(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn draw_header(app: &App, frame: &mut Frame, area: Rect) {
    let feed = match app.context {
        None => "no location selected".to_string(),
        Some(FilterContext::All) => "all posts".to_string(),
        Some(FilterContext::Location(id)) => app
            .location_name(id)
            .map(String::from)
            .unwrap_or_else(|| format!("location {id}")),
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" wp-reader ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(feed, Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("  ({} locations)", app.locations.len()),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    frame.render_widget(header, area);
}

fn draw_message(frame: &mut Frame, area: Rect, text: &str, color: Color) {
    let message = Paragraph::new(text.to_string())
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(message, area);
}

/// Render the scrollable post list.
fn draw_post_list(app: &mut App, frame: &mut Frame, area: Rect) {
    app.viewport = area.height.saturating_sub(2) as usize;

    let mut list_items: Vec<ListItem> = app.items.iter().map(post_line).collect();
    if app.loading && !app.items.is_empty() {
        list_items.push(ListItem::new(Span::styled(
            "  loading…",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let list = List::new(list_items)
        .block(Block::default().title(" Posts ").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn post_line(post: &Post) -> ListItem<'static> {
    let mut spans = vec![
        Span::styled(
            format!("{:<17}", format_date(&post.published_at)),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
    ];
    if post.sticky {
        spans.push(Span::styled("★ ", Style::default().fg(Color::Yellow)));
    }
    spans.push(Span::styled(
        post.display_title(),
        Style::default().fg(Color::White),
    ));
    ListItem::new(Line::from(spans))
}

fn draw_detail(app: &App, frame: &mut Frame, area: Rect) {
    let Some(post) = app.selected_post() else {
        frame.render_widget(Block::default().title(" Detail ").borders(Borders::ALL), area);
        return;
    };

    let image = match &post.featured_image_url {
        None => "none".to_string(),
        Some(url) => match app.image_status(url) {
            None | Some(ImageStatus::Loading) => "loading…".to_string(),
            Some(ImageStatus::Ready { format, size }) => format!("{format}, {size} bytes"),
            Some(ImageStatus::Failed(e)) => format!("unavailable ({e})"),
        },
    };

    let lines = vec![
        Line::from(Span::styled(
            post.display_title(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            post.url.clone().unwrap_or_default(),
            Style::default().fg(Color::Blue),
        )),
        Line::from(Span::styled(
            format!("image: {image}"),
            Style::default().fg(Color::DarkGray),
        )),
        Line::raw(""),
        Line::raw(post.display_excerpt()),
    ];

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().title(" Detail ").borders(Borders::ALL));
    frame.render_widget(detail, area);
}

/// Contact details of a location: only the fields it actually has, plus a
/// map link when it has coordinates.
fn location_lines(location: &Location) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        location.name.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    let place = [&location.address, &location.city]
        .into_iter()
        .flatten()
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if !place.is_empty() {
        lines.push(Line::raw(place));
    }
    for (label, value) in [
        ("phone", &location.phone),
        ("email", &location.email),
        ("contact", &location.contact),
    ] {
        if let Some(value) = value {
            lines.push(Line::raw(format!("{label}: {value}")));
        }
    }
    if let Some(url) = location.directions_url() {
        lines.push(Line::from(Span::styled(
            format!("directions: {url}"),
            Style::default().fg(Color::Blue),
        )));
    }
    lines
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let more = if app.has_more { "" } else { " (end)" };
    let status = Paragraph::new(Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(&app.status, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!("{} posts{more}", app.items.len()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  q: quit  ↑/↓: scroll  r: refresh  l: location  a: all"),
    ]));
    frame.render_widget(status, area);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{loaded_app, make_location};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn render(app: &mut App, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();
        let buf = terminal.backend().buffer().clone();
        buf.content()
            .iter()
            .map(|c| c.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    #[test]
    fn dates_are_shortened_when_parseable() {
        assert_eq!(format_date("2025-06-01T12:00:00"), "2025-06-01 12:00");
        assert_eq!(format_date("June 1st"), "June 1st");
    }

    #[test]
    fn welcome_screen_without_context() {
        let mut app = App::new();
        let text = render(&mut app, 100, 20);
        assert!(text.contains("Welcome!"));
    }

    #[test]
    fn draws_posts_and_item_count() {
        let mut app = loaded_app(3);
        let text = render(&mut app, 120, 24);
        assert!(text.contains("Post 1"), "titles are shown without markup");
        assert!(text.contains("3 posts"), "status bar should show item count");
        assert_eq!(app.viewport, 24 - 2 - 2);
    }

    #[test]
    fn error_view_when_first_page_failed() {
        let mut app = App::new();
        app.begin_context(Some(FilterContext::All));
        app.error = Some("Error loading posts: boom".into());
        let text = render(&mut app, 100, 20);
        assert!(text.contains("Error loading posts: boom"));
        assert!(text.contains("Press r to retry"));
    }

    #[test]
    fn detail_pane_shows_image_state() {
        let mut app = loaded_app(2);
        app.items[0].featured_image_url = Some("https://site.test/a.png".into());
        app.images.insert(
            "https://site.test/a.png".into(),
            ImageStatus::Ready {
                format: wp_reader::cache::ImageFormat::Png,
                size: 1234,
            },
        );
        let text = render(&mut app, 140, 24);
        assert!(text.contains("image: png, 1234 bytes"));
    }

    #[test]
    fn location_contact_details_are_shown() {
        let mut app = loaded_app(2);
        let mut hall = make_location(1, "Town Hall");
        hall.phone = Some("403-555-0100".into());
        hall.email = Some("hall@site.test".into());
        hall.latitude = 51.04;
        hall.longitude = -114.07;
        app.set_locations(vec![hall]);

        let text = render(&mut app, 200, 30);
        assert!(text.contains("phone: 403-555-0100"));
        assert!(text.contains("email: hall@site.test"));
        assert!(text.contains(
            "directions: https://www.google.com/maps/search/?api=1&query=51.04,-114.07"
        ));
    }

    #[test]
    fn no_directions_without_coordinates() {
        let mut app = loaded_app(2);
        let mut hall = make_location(1, "Town Hall");
        hall.phone = Some("403-555-0100".into());
        app.set_locations(vec![hall]);

        let text = render(&mut app, 200, 30);
        assert!(text.contains("phone: 403-555-0100"));
        assert!(!text.contains("directions:"));
    }
}
