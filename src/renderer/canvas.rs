//! Canvas 2D backend
//!
//! [`Canvas2d`] is the subset of a 2D drawing context that painters use.
//! [`CommandCanvas`] implements it by recording every call, which is what the
//! CLI emits and what tests assert against.

use serde::Serialize;

/// 2D drawing context
pub trait Canvas2d {
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f64, y: f64);
    fn set_fill_style(&mut self, style: &str);
    fn set_stroke_style(&mut self, style: &str);
    fn set_line_width(&mut self, width: f64);
    fn set_font(&mut self, font: &str);
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn begin_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64);
    fn close_path(&mut self);
    fn fill(&mut self);
    fn stroke(&mut self);
    fn fill_text(&mut self, text: &str, x: f64, y: f64);

    /// Pixel size of the drawing surface, when known
    fn size(&self) -> Option<(f64, f64)> {
        None
    }
}

/// One recorded canvas call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum CanvasCommand {
    Save,
    Restore,
    Translate { x: f64, y: f64 },
    SetFillStyle { style: String },
    SetStrokeStyle { style: String },
    SetLineWidth { width: f64 },
    SetFont { font: String },
    FillRect { x: f64, y: f64, width: f64, height: f64 },
    StrokeRect { x: f64, y: f64, width: f64, height: f64 },
    BeginPath,
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    Arc { x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64 },
    ClosePath,
    Fill,
    Stroke,
    FillText { text: String, x: f64, y: f64 },
}

/// A canvas that records calls instead of drawing
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommandCanvas {
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<(f64, f64)>,
    commands: Vec<CanvasCommand>,
}

impl CommandCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(width: f64, height: f64) -> Self {
        Self {
            size: Some((width, height)),
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[CanvasCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<CanvasCommand> {
        self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// The recording as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.commands)
    }

    fn push(&mut self, command: CanvasCommand) {
        self.commands.push(command);
    }
}

impl Canvas2d for CommandCanvas {
    fn save(&mut self) {
        self.push(CanvasCommand::Save);
    }

    fn restore(&mut self) {
        self.push(CanvasCommand::Restore);
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.push(CanvasCommand::Translate { x, y });
    }

    fn set_fill_style(&mut self, style: &str) {
        self.push(CanvasCommand::SetFillStyle {
            style: style.to_string(),
        });
    }

    fn set_stroke_style(&mut self, style: &str) {
        self.push(CanvasCommand::SetStrokeStyle {
            style: style.to_string(),
        });
    }

    fn set_line_width(&mut self, width: f64) {
        self.push(CanvasCommand::SetLineWidth { width });
    }

    fn set_font(&mut self, font: &str) {
        self.push(CanvasCommand::SetFont {
            font: font.to_string(),
        });
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(CanvasCommand::FillRect {
            x,
            y,
            width,
            height,
        });
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(CanvasCommand::StrokeRect {
            x,
            y,
            width,
            height,
        });
    }

    fn begin_path(&mut self) {
        self.push(CanvasCommand::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.push(CanvasCommand::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.push(CanvasCommand::LineTo { x, y });
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64) {
        self.push(CanvasCommand::Arc {
            x,
            y,
            radius,
            start_angle,
            end_angle,
        });
    }

    fn close_path(&mut self) {
        self.push(CanvasCommand::ClosePath);
    }

    fn fill(&mut self) {
        self.push(CanvasCommand::Fill);
    }

    fn stroke(&mut self) {
        self.push(CanvasCommand::Stroke);
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.push(CanvasCommand::FillText {
            text: text.to_string(),
            x,
            y,
        });
    }

    fn size(&self) -> Option<(f64, f64)> {
        self.size
    }
}
