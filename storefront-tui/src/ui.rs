use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use storefront_core::{FeedError, FeedMode, FeedView, Product};

use crate::app::{App, Screen};

/// Rows the list can show inside its border for a frame of `height` rows.
pub fn list_rows(height: u16) -> usize {
    // border top + bottom, status bar
    height.saturating_sub(3) as usize
}

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    match (app.screen, app.feed.as_ref()) {
        (Screen::Feed, Some(feed)) => {
            draw_feed(frame, app, &feed.view(), feed.collection(), chunks[0])
        }
        _ => draw_collections(frame, app, chunks[0]),
    }
    draw_status(frame, app, chunks[1]);
}

fn draw_collections(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .collections
        .iter()
        .map(|c| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<24}", c.title), Style::default().fg(Color::Yellow)),
                Span::styled(
                    format!(" {} products", c.product_count),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let selected = (!app.collections.is_empty()).then_some(app.collection_selected);
    render_list(frame, items, " Collections ".to_string(), selected, area);
}

fn render_list(
    frame: &mut Frame,
    items: Vec<ListItem<'_>>,
    title: String,
    selected: Option<usize>,
    area: Rect,
) {
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(title),
        )
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");
    let mut state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, area, &mut state);
}

fn product_line(product: &Product) -> Line<'_> {
    let mut spans = vec![
        Span::styled(format!("{:<32}", product.name), Style::default().fg(Color::White)),
        Span::styled(
            format!("{:>10}", product.display_price()),
            Style::default().fg(Color::Green),
        ),
    ];
    if product.is_on_sale() {
        spans.push(Span::styled(" SALE", Style::default().fg(Color::Magenta)));
    }
    if !product.in_stock {
        spans.push(Span::styled(" sold out", Style::default().fg(Color::DarkGray)));
    }
    Line::from(spans)
}

/// The row after the last product: what happens next in this feed.
fn footer_line(view: &FeedView<'_, Product>) -> Line<'static> {
    let (text, color) = if view.loading {
        ("  Loading more...".to_string(), Color::Yellow)
    } else if let Some(err) = view.error {
        match err {
            FeedError::FetchFailed { message, retry_in } => (
                format!("  {} (retrying in {:.1}s)", message, retry_in.as_secs_f64()),
                Color::Red,
            ),
            FeedError::Exhausted { message } => (format!("  {} [r] retry", message), Color::Red),
        }
    } else if !view.has_more {
        ("  End of collection".to_string(), Color::DarkGray)
    } else if view.mode == FeedMode::Manual {
        ("  [m] Load more".to_string(), Color::Cyan)
    } else {
        (String::new(), Color::DarkGray)
    };
    Line::from(Span::styled(text, Style::default().fg(color)))
}

fn draw_feed(
    frame: &mut Frame,
    app: &App,
    view: &FeedView<'_, Product>,
    key: &str,
    area: Rect,
) {
    let mut items: Vec<ListItem> = view
        .items
        .iter()
        .map(|p| ListItem::new(product_line(p)))
        .collect();
    items.push(ListItem::new(footer_line(view)));

    let selected = (!view.items.is_empty()).then_some(app.selected);
    render_list(frame, items, format!(" {} ", key), selected, area);
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();

    match (app.screen, app.feed.as_ref()) {
        (Screen::Feed, Some(feed)) => {
            let view = feed.view();
            let mode = match view.mode {
                FeedMode::Auto => "auto",
                FeedMode::Manual => "manual",
            };
            spans.push(Span::styled(
                format!(" {} | {} items | {} ", feed.collection(), view.items.len(), mode),
                Style::default().fg(Color::Cyan),
            ));
            if view.loading {
                spans.push(Span::styled(" loading... ", Style::default().fg(Color::Yellow)));
            }
        }
        _ => {
            spans.push(Span::styled(" storefront ", Style::default().fg(Color::Cyan)));
            if app.loading {
                spans.push(Span::styled(" loading... ", Style::default().fg(Color::Yellow)));
            }
        }
    }

    if !app.status_message.is_empty() {
        spans.push(Span::styled(
            format!(" {} ", app.status_message),
            Style::default().fg(Color::Red),
        ));
    }

    let help = match app.screen {
        Screen::Collections => " q:quit Enter:open j/k:move ",
        Screen::Feed => " q:quit b:back j/k:move m:more r:retry PgUp/Dn:scroll ",
    };
    spans.push(Span::styled(help, Style::default().fg(Color::DarkGray)));

    let bar = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(bar, area);
}
