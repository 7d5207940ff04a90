//! Per-element draw routines and editor decorations.

use crate::display_list::{DisplayList, TextRun};
use kurbo::{Affine, BezPath, Cap, Circle, Ellipse, Join, Point, Rect, Shape, Size, Stroke};
use peniko::Color;
use roughboard_core::EditorConfig;
use roughboard_core::drawable::{DrawablePart, diamond_points, polygon_path, polyline_path};
use roughboard_core::element::{Element, ElementKind, ImageStatus, SerializableColor, TextAlign};
use roughboard_core::geometry::bounds_of;
use roughboard_core::selection::get_handles;

const HANDLE_RADIUS: f64 = 4.0;
const FREEDRAW_OUTLINE_OFFSET: f64 = 4.0;
const MARQUEE_FILL_ALPHA: u8 = 25;
const BINDING_INDICATOR_RADIUS: f64 = 6.0;
const GROUP_DASH: [f64; 2] = [5.0, 5.0];
/// Grids denser than this per axis are skipped.
const MAX_GRID_LINES: usize = 2000;

fn faded(color: SerializableColor, opacity: f64) -> Color {
    color.with_opacity(opacity).into()
}

fn element_stroke(width: f64, dashed: bool) -> Stroke {
    let stroke = Stroke::new(width).with_caps(Cap::Round).with_join(Join::Round);
    if dashed { stroke.with_dashes(0.0, GROUP_DASH) } else { stroke }
}

/// Dashed stroke that keeps its on-screen width at any zoom.
fn decoration_stroke(config: &EditorConfig, zoom: f64) -> Stroke {
    Stroke::new(1.0 / zoom).with_dashes(0.0, config.selection_dash.map(|dash| dash / zoom))
}

/// Fill the whole viewport. `size` is in device pixels.
pub fn draw_background(list: &mut DisplayList, size: Size, color: Color) {
    list.fill(Affine::IDENTITY, Rect::from_origin_size(Point::ZERO, size).to_path(0.1), color);
}

/// Record one element and, for groups, its children.
///
/// `parent` maps the element's parent frame to device pixels.
pub fn draw_element(list: &mut DisplayList, element: &Element, parent: Affine, line_height: f64) {
    let transform = parent * Affine::translate(element.origin().to_vec2());
    let opacity = (element.opacity / 100.0).clamp(0.0, 1.0);

    for part in &element.drawable().parts {
        match part {
            DrawablePart::Fill { path, color } => list.fill(transform, path.clone(), faded(*color, opacity)),
            DrawablePart::Stroke {
                path,
                color,
                width,
                dashed,
            } => list.stroke(transform, path.clone(), element_stroke(*width, *dashed), faded(*color, opacity)),
        }
    }

    match &element.kind {
        ElementKind::Text(text) => {
            let x = match text.text_align {
                TextAlign::Left => 0.0,
                TextAlign::Center => text.width / 2.0,
                TextAlign::Right => text.width,
            };
            for (index, line) in text.lines().enumerate() {
                list.text(
                    transform,
                    TextRun {
                        text: line.to_string(),
                        origin: Point::new(x, index as f64 * text.font_size * line_height),
                        font_size: text.font_size,
                        font_family: text.font_family.css_name(),
                        align: text.text_align,
                        color: faded(element.stroke_color, opacity),
                    },
                );
            }
        }
        ElementKind::Image(image) => {
            let rect = Rect::from_points(Point::ZERO, Point::new(image.width, image.height));
            match (image.status, image.file_id.as_deref()) {
                (ImageStatus::Saved, Some(file_id)) => list.image(transform, rect, file_id),
                _ => draw_image_marker(list, transform, rect, faded(element.stroke_color, opacity)),
            }
        }
        ElementKind::Group(group) => {
            for child in &group.children {
                draw_element(list, child, transform, line_height);
            }
        }
        _ => {}
    }
}

/// Small picture icon centred in an image without pixel data.
fn draw_image_marker(list: &mut DisplayList, transform: Affine, rect: Rect, color: Color) {
    let s = rect.width().abs().min(rect.height().abs()) / 4.0;
    if s <= 0.0 {
        return;
    }
    let center = rect.center();
    let mut mountain = BezPath::new();
    mountain.move_to((center.x - s, center.y + s / 2.0));
    mountain.line_to((center.x - s / 3.0, center.y - s / 3.0));
    mountain.line_to((center.x + s / 3.0, center.y + s / 4.0));
    mountain.line_to((center.x + s, center.y + s / 2.0));
    let sun = Circle::new((center.x + s / 2.0, center.y - s / 2.0), s / 5.0).to_path(0.1);

    let stroke = element_stroke(1.5, false);
    list.stroke(transform, mountain, stroke.clone(), color);
    list.stroke(transform, sun, stroke, color);
}

/// Dashed outline around a selected top-level element, shaped per type.
pub fn draw_selection_outline(
    list: &mut DisplayList,
    element: &Element,
    transform: Affine,
    config: &EditorConfig,
    zoom: f64,
) {
    let offset = config.selection_offset;
    let rect = bounds_of(element);
    let path = match &element.kind {
        ElementKind::Diamond(_) => polygon_path(&diamond_points(rect.inflate(offset, offset))),
        ElementKind::Ellipse(_) => Ellipse::from_rect(rect.inflate(offset, offset)).to_path(0.1),
        ElementKind::Arrow(_) | ElementKind::Line(_) => polyline_path(&element.absolute_points()),
        ElementKind::Freedraw(_) => rect.inflate(FREEDRAW_OUTLINE_OFFSET, FREEDRAW_OUTLINE_OFFSET).to_path(0.1),
        _ => rect.inflate(offset, offset).to_path(0.1),
    };
    list.stroke(transform, path, decoration_stroke(config, zoom), config.selection_color.into());
}

/// Resize handles as small circles that keep their screen size.
pub fn draw_handles(list: &mut DisplayList, element: &Element, transform: Affine, config: &EditorConfig, zoom: f64) {
    for handle in get_handles(element) {
        let circle = Circle::new(handle.position, HANDLE_RADIUS / zoom).to_path(0.1);
        list.fill(transform, circle.clone(), Color::WHITE);
        list.stroke(transform, circle, Stroke::new(1.5 / zoom), config.selection_color.into());
    }
}

/// Translucent marquee with a dashed border.
pub fn draw_marquee(list: &mut DisplayList, rect: Rect, transform: Affine, config: &EditorConfig, zoom: f64) {
    let path = rect.to_path(0.1);
    let fill = SerializableColor {
        a: MARQUEE_FILL_ALPHA,
        ..config.selection_color
    };
    list.fill(transform, path.clone(), fill.into());
    list.stroke(transform, path, decoration_stroke(config, zoom), config.selection_color.into());
}

/// Ring marking where an arrow or line would attach.
pub fn draw_binding_indicator(
    list: &mut DisplayList,
    point: Point,
    transform: Affine,
    config: &EditorConfig,
    zoom: f64,
) {
    let ring = Circle::new(point, BINDING_INDICATOR_RADIUS / zoom).to_path(0.1);
    let fill = SerializableColor {
        a: MARQUEE_FILL_ALPHA * 2,
        ..config.selection_color
    };
    list.fill(transform, ring.clone(), fill.into());
    list.stroke(transform, ring, Stroke::new(2.0 / zoom), config.selection_color.into());
}

/// Grid lines covering `visible` (world coordinates), batched into one path.
pub fn draw_grid(list: &mut DisplayList, visible: Rect, grid_size: f64, transform: Affine, color: Color, zoom: f64) {
    if grid_size <= 0.0 {
        return;
    }
    let start_x = (visible.x0 / grid_size).floor() * grid_size;
    let start_y = (visible.y0 / grid_size).floor() * grid_size;
    let end_x = (visible.x1 / grid_size).ceil() * grid_size;
    let end_y = (visible.y1 / grid_size).ceil() * grid_size;
    let columns = ((end_x - start_x) / grid_size).round() as usize + 1;
    let rows = ((end_y - start_y) / grid_size).round() as usize + 1;
    if columns > MAX_GRID_LINES || rows > MAX_GRID_LINES {
        log::debug!("Skipping grid: {columns}x{rows} lines");
        return;
    }

    let mut path = BezPath::new();
    for i in 0..columns {
        let x = start_x + i as f64 * grid_size;
        path.move_to((x, start_y));
        path.line_to((x, end_y));
    }
    for i in 0..rows {
        let y = start_y + i as f64 * grid_size;
        path.move_to((start_x, y));
        path.line_to((end_x, y));
    }
    list.stroke(transform, path, Stroke::new(1.0 / zoom), color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display_list::DrawCommand;
    use kurbo::Vec2;
    use roughboard_core::element::{ActiveStyle, ElementId, ElementType, TextShape};

    fn make(element_type: ElementType, start: (f64, f64), end: (f64, f64)) -> Element {
        Element::create(element_type, start.into(), end.into(), &ActiveStyle::default())
    }

    fn texts(list: &DisplayList) -> Vec<&TextRun> {
        list.commands()
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text { run, .. } => Some(run),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_element_commands_use_origin() {
        let mut list = DisplayList::new();
        let rect = make(ElementType::Rectangle, (30.0, 40.0), (130.0, 90.0));
        draw_element(&mut list, &rect, Affine::IDENTITY, 1.2);
        assert!(!list.is_empty());
        for command in list.commands() {
            assert_eq!(command.transform().translation(), Vec2::new(30.0, 40.0));
        }
    }

    #[test]
    fn test_opacity_multiplies_alpha() {
        let mut list = DisplayList::new();
        let mut line = make(ElementType::Line, (0.0, 0.0), (100.0, 0.0));
        line.opacity = 50.0;
        draw_element(&mut list, &line, Affine::IDENTITY, 1.2);
        let DrawCommand::Stroke { color, .. } = &list.commands()[0] else {
            panic!("expected a stroke");
        };
        assert_eq!(color.to_rgba8().a, 128);
    }

    #[test]
    fn test_text_lines_stack() {
        let mut list = DisplayList::new();
        let mut text = Element::new(ElementKind::Text(TextShape::default()), Point::new(10.0, 10.0));
        text.set_text("one\ntwo\nthree", 1.2);
        draw_element(&mut list, &text, Affine::IDENTITY, 1.2);

        let runs = texts(&list);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[2].text, "three");
        assert!((runs[1].origin.y - 24.0).abs() < 1e-9);
        assert!((runs[2].origin.y - 48.0).abs() < 1e-9);
        assert_eq!(runs[0].origin.x, 0.0);
    }

    #[test]
    fn test_text_alignment_anchor() {
        let mut list = DisplayList::new();
        let mut shape = TextShape::default();
        shape.text_align = TextAlign::Center;
        let text = Element::new(ElementKind::Text(shape), Point::ZERO);
        draw_element(&mut list, &text, Affine::IDENTITY, 1.2);
        assert!((texts(&list)[0].origin.x - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_image_placeholder_or_pixels() {
        let mut image = make(ElementType::Image, (0.0, 0.0), (0.0, 0.0));
        let mut list = DisplayList::new();
        draw_element(&mut list, &image, Affine::IDENTITY, 1.2);
        assert!(!list.commands().iter().any(|c| matches!(c, DrawCommand::Image { .. })));

        if let ElementKind::Image(shape) = &mut image.kind {
            shape.status = ImageStatus::Saved;
            shape.file_id = Some("file-1".to_string());
        }
        let mut list = DisplayList::new();
        draw_element(&mut list, &image, Affine::IDENTITY, 1.2);
        let image_rects: Vec<Rect> = list
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Image { rect, file_id, .. } if file_id == "file-1" => Some(*rect),
                _ => None,
            })
            .collect();
        assert_eq!(image_rects, vec![Rect::new(0.0, 0.0, 200.0, 150.0)]);
    }

    #[test]
    fn test_group_children_nested_transform() {
        let child = make(ElementType::Line, (0.0, 0.0), (50.0, 0.0));
        let group = Element::group(ElementId::from("g"), Rect::new(100.0, 100.0, 150.0, 100.0), vec![child]);
        let mut list = DisplayList::new();
        draw_element(&mut list, &group, Affine::IDENTITY, 1.2);

        let last = list.commands().last().unwrap();
        assert_eq!(last.transform().translation(), Vec2::new(100.0, 100.0));
        assert!(list.len() >= 2);
    }

    #[test]
    fn test_group_outline_dash() {
        let group = Element::group(ElementId::from("g"), Rect::new(0.0, 0.0, 80.0, 40.0), Vec::new());
        let mut list = DisplayList::new();
        draw_element(&mut list, &group, Affine::IDENTITY, 1.2);

        let dashes: Vec<&[f64]> = list
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Stroke { style, .. } => Some(&style.dash_pattern[..]),
                _ => None,
            })
            .collect();
        assert!(!dashes.is_empty());
        assert!(dashes.iter().all(|dash| *dash == [5.0, 5.0]));
    }

    #[test]
    fn test_grid_batched_over_visible_rect() {
        let mut list = DisplayList::new();
        draw_grid(&mut list, Rect::new(5.0, 5.0, 95.0, 95.0), 20.0, Affine::IDENTITY, Color::BLACK, 1.0);
        assert_eq!(list.len(), 1);
        let DrawCommand::Stroke { path, .. } = &list.commands()[0] else {
            panic!("expected a stroke");
        };
        assert_eq!(path.bounding_box(), Rect::new(0.0, 0.0, 100.0, 100.0));

        let mut list = DisplayList::new();
        draw_grid(&mut list, Rect::new(0.0, 0.0, 1e9, 1e9), 1.0, Affine::IDENTITY, Color::BLACK, 1.0);
        assert!(list.is_empty());
    }

    #[test]
    fn test_handles_keep_screen_size() {
        let config = EditorConfig::default();
        let rect = make(ElementType::Rectangle, (0.0, 0.0), (100.0, 50.0));
        let mut list = DisplayList::new();
        draw_handles(&mut list, &rect, Affine::IDENTITY, &config, 2.0);
        assert_eq!(list.len(), 16);
        let DrawCommand::Fill { path, .. } = &list.commands()[0] else {
            panic!("expected a fill");
        };
        assert!((path.bounding_box().width() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_outline_offsets() {
        let config = EditorConfig::default();
        let rect = make(ElementType::Rectangle, (0.0, 0.0), (100.0, 50.0));
        let mut list = DisplayList::new();
        draw_selection_outline(&mut list, &rect, Affine::IDENTITY, &config, 1.0);
        let DrawCommand::Stroke { path, style, .. } = &list.commands()[0] else {
            panic!("expected a stroke");
        };
        assert_eq!(path.bounding_box(), Rect::new(-2.0, -2.0, 102.0, 52.0));
        assert_eq!(style.dash_pattern.as_slice(), &[5.0, 5.0]);
    }
}
