use ratatui::prelude::*;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Context, Line as CanvasLine, Map, MapResolution, Points};
use ratatui::widgets::{Block, Borders};

use crate::geo::Geocoder;
use crate::map::{
    CursorStyle, HighlightLayer, HoverState, MapView, Viewport, HIGHLIGHT_FILL, HIGHLIGHT_OUTLINE,
};
use crate::sync::{PinBackend, PinId};

/// Fill samples per cell along each axis
const FILL_SAMPLES: u16 = 2;

const PIN_SYMBOL: &str = "●";
const CROSSHAIR_SYMBOL: &str = "+";

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

/// Render the map and return the inner area it was drawn in
pub fn render<B: PinBackend>(
    frame: &mut Frame,
    area: Rect,
    view: &MapView<B>,
    hover: HoverState,
    hovered_pin: Option<PinId>,
) -> Rect {
    let viewport = *view.viewport();
    let block = Block::default()
        .title(" World Map ")
        .title_bottom(Line::from(format!(" {} ", viewport.display())).right_aligned())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);

    let bounds = viewport.bounds();
    let fill = highlight_fill(view.geocoder(), view.highlight(), &viewport);
    let outlines = outlines(view.geocoder(), view.highlight(), &viewport);

    let selected = view.selection().and_then(|s| s.pin_id);
    let pointer = !hover.is_dragging && view.cursor_style(hover) == CursorStyle::Pointer;
    let markers: Vec<(f64, f64, Color)> = view
        .pins()
        .pins()
        .iter()
        .map(|pin| {
            let color = if Some(pin.id) == selected {
                Color::Yellow
            } else if pointer && Some(pin.id) == hovered_pin {
                Color::LightRed
            } else {
                Color::Red
            };
            (pin.longitude, pin.latitude, color)
        })
        .collect();
    let ad_hoc = view
        .selection()
        .filter(|s| s.pin_id.is_none())
        .map(|s| (s.longitude, s.latitude));

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([bounds.west, bounds.east])
        .y_bounds([bounds.south, bounds.north])
        .paint(move |ctx| {
            ctx.draw(&Map {
                color: Color::DarkGray,
                resolution: MapResolution::High,
            });

            ctx.draw(&Points {
                coords: &fill,
                color: rgb(HIGHLIGHT_FILL),
            });
            ctx.layer();

            for line in &outlines {
                ctx.draw(line);
            }
            ctx.layer();

            draw_crosshair(ctx, &viewport);
            if let Some((lon, lat)) = ad_hoc {
                ctx.print(lon, lat, Span::styled("x", Style::default().fg(Color::Yellow).bold()));
            }
            for (lon, lat, color) in &markers {
                ctx.print(*lon, *lat, Span::styled(PIN_SYMBOL, Style::default().fg(*color)));
            }
        });

    frame.render_widget(canvas, area);
    inner
}

fn draw_crosshair(ctx: &mut Context, viewport: &Viewport) {
    ctx.print(
        viewport.longitude,
        viewport.latitude,
        Span::styled(CROSSHAIR_SYMBOL, Style::default().fg(Color::Gray)),
    );
}

/// Sample points inside highlighted countries that fall in view
fn highlight_fill(
    geocoder: &Geocoder,
    highlight: &HighlightLayer,
    viewport: &Viewport,
) -> Vec<(f64, f64)> {
    if !highlight.is_ready() {
        return Vec::new();
    }

    let bounds = viewport.bounds();
    let highlighted: Vec<_> = geocoder
        .countries()
        .iter()
        .filter(|country| highlight.is_highlighted(&country.code))
        .filter(|country| country.bbox.intersects(&bounds))
        .collect();
    if highlighted.is_empty() {
        return Vec::new();
    }

    let cols = viewport.width.max(1) * FILL_SAMPLES;
    let rows = viewport.height.max(1) * FILL_SAMPLES;
    let step_lon = bounds.width() / f64::from(cols);
    let step_lat = bounds.height() / f64::from(rows);

    let mut points = Vec::new();
    for row in 0..rows {
        let lat = bounds.north - (f64::from(row) + 0.5) * step_lat;
        for col in 0..cols {
            let lon = bounds.west + (f64::from(col) + 0.5) * step_lon;
            if highlighted.iter().any(|country| country.contains(lon, lat)) {
                points.push((lon, lat));
            }
        }
    }
    points
}

/// Boundary segments of every dataset country in view
fn outlines(
    geocoder: &Geocoder,
    highlight: &HighlightLayer,
    viewport: &Viewport,
) -> Vec<CanvasLine> {
    let bounds = viewport.bounds();
    let mut lines = Vec::new();

    for country in geocoder.countries() {
        if !country.bbox.intersects(&bounds) {
            continue;
        }
        let color = if highlight.is_highlighted(&country.code) {
            rgb(HIGHLIGHT_OUTLINE)
        } else {
            Color::Rgb(90, 90, 90)
        };

        for polygon in &country.shape {
            let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
            for segment in rings.flat_map(|ring| ring.lines()) {
                lines.push(CanvasLine {
                    x1: segment.start.x,
                    y1: segment.start.y,
                    x2: segment.end.x,
                    y2: segment.end.y,
                    color,
                });
            }
        }
    }
    lines
}
