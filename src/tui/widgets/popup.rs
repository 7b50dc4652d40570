use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::map::{Affordance, Selection};

const POPUP_WIDTH: u16 = 52;
const POPUP_HEIGHT: u16 = 8;

/// Render the popup for the selected pin or location
pub fn render(
    frame: &mut Frame,
    map_area: Rect,
    selection: &Selection,
    affordance: Option<&Affordance>,
    dataset_name: Option<&str>,
) {
    let area = popup_area(map_area);
    let title = if selection.pin_id.is_some() {
        " Pin "
    } else {
        " Location "
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let country = match (affordance, dataset_name, &selection.country) {
        (Some(affordance), _, _) => affordance.country_name().to_string(),
        (None, Some(name), _) => name.to_string(),
        (None, None, Some(code)) => code.to_string(),
        (None, None, None) => "Unknown country".to_string(),
    };

    let mut lines = vec![
        Line::from(Span::styled(country, Style::default().bold().fg(Color::White))),
        Line::from(Span::styled(
            format!("{:.4}, {:.4}", selection.latitude, selection.longitude),
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
    ];

    match affordance {
        Some(affordance) => lines.push(Line::from(vec![
            Span::styled(
                affordance.label(),
                Style::default().fg(Color::Cyan).underlined(),
            ),
            Span::styled("  (o)", Style::default().fg(Color::Yellow)),
        ])),
        None => lines.push(Line::from(Span::styled(
            "No trip information for this location",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    let mut controls = Vec::new();
    if selection.pin_id.is_some() {
        controls.push(Span::styled("x", Style::default().fg(Color::Yellow)));
        controls.push(Span::raw(": delete this pin  "));
    }
    controls.push(Span::styled("Esc", Style::default().fg(Color::Yellow)));
    controls.push(Span::raw(": close"));
    lines.push(Line::from(controls));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

/// Bottom-left corner of the map, shrunk to fit
fn popup_area(map_area: Rect) -> Rect {
    let width = POPUP_WIDTH.min(map_area.width);
    let height = POPUP_HEIGHT.min(map_area.height);
    Rect {
        x: map_area.x,
        y: map_area.y + map_area.height - height,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popup_sits_in_bottom_left() {
        let map = Rect::new(1, 4, 120, 40);
        let area = popup_area(map);
        assert_eq!(area, Rect::new(1, 36, POPUP_WIDTH, POPUP_HEIGHT));
    }

    #[test]
    fn test_popup_fits_small_map() {
        let map = Rect::new(0, 0, 30, 5);
        let area = popup_area(map);
        assert_eq!(area, map);
    }
}
