use crate::types::{Color, clamp_unit, fmt_num};

// Bezier control distance for a quarter circle of radius 1.
const KAPPA: f64 = 0.552_284_75;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SaveState,
    RestoreState,
    SetFillColor(Color),
    SetStrokeColor(Color),
    SetLineWidth(f64),
    MoveTo {
        x: f64,
        y: f64,
    },
    CurveTo {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x: f64,
        y: f64,
    },
    ClosePath,
    Stroke,
    FillStroke,
    // `text` is already encoded for the font (WinAnsi for the standard fonts).
    DrawString {
        x: f64,
        y: f64,
        font: String,
        size: f64,
        text: Vec<u8>,
    },
    DrawImage {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        resource: String,
    },
}

/// Overlay drawing for a single page, in native page units.
#[derive(Debug, Clone, Default)]
pub struct PageCanvas {
    commands: Vec<Command>,
}

impl PageCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn save_state(&mut self) {
        self.commands.push(Command::SaveState);
    }

    pub fn restore_state(&mut self) {
        self.commands.push(Command::RestoreState);
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.commands.push(Command::SetFillColor(color));
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.commands.push(Command::SetStrokeColor(color));
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.commands.push(Command::SetLineWidth(width));
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.commands.push(Command::MoveTo { x, y });
    }

    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) {
        self.commands.push(Command::CurveTo {
            x1,
            y1,
            x2,
            y2,
            x,
            y,
        });
    }

    pub fn close_path(&mut self) {
        self.commands.push(Command::ClosePath);
    }

    pub fn stroke(&mut self) {
        self.commands.push(Command::Stroke);
    }

    pub fn fill_stroke(&mut self) {
        self.commands.push(Command::FillStroke);
    }

    /// Closed circle path built from four cubic segments.
    pub fn circle_path(&mut self, cx: f64, cy: f64, radius: f64) {
        let c = radius * KAPPA;
        self.move_to(cx + radius, cy);
        self.curve_to(cx + radius, cy + c, cx + c, cy + radius, cx, cy + radius);
        self.curve_to(cx - c, cy + radius, cx - radius, cy + c, cx - radius, cy);
        self.curve_to(cx - radius, cy - c, cx - c, cy - radius, cx, cy - radius);
        self.curve_to(cx + c, cy - radius, cx + radius, cy - c, cx + radius, cy);
        self.close_path();
    }

    pub fn draw_string(
        &mut self,
        x: f64,
        y: f64,
        font: impl Into<String>,
        size: f64,
        text: Vec<u8>,
    ) {
        self.commands.push(Command::DrawString {
            x,
            y,
            font: font.into(),
            size,
            text,
        });
    }

    pub fn draw_image(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        resource: impl Into<String>,
    ) {
        self.commands.push(Command::DrawImage {
            x,
            y,
            width,
            height,
            resource: resource.into(),
        });
    }

    /// Content-stream operators for the recorded commands.
    pub fn encode(&self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        for cmd in &self.commands {
            match cmd {
                Command::SaveState => out.extend_from_slice(b"q\n"),
                Command::RestoreState => out.extend_from_slice(b"Q\n"),
                Command::SetFillColor(color) => {
                    out.extend_from_slice(format!("{} rg\n", color_operands(*color)).as_bytes());
                }
                Command::SetStrokeColor(color) => {
                    out.extend_from_slice(format!("{} RG\n", color_operands(*color)).as_bytes());
                }
                Command::SetLineWidth(width) => {
                    out.extend_from_slice(format!("{} w\n", fmt_num(*width)).as_bytes());
                }
                Command::MoveTo { x, y } => {
                    out.extend_from_slice(format!("{} {} m\n", fmt_num(*x), fmt_num(*y)).as_bytes());
                }
                Command::CurveTo {
                    x1,
                    y1,
                    x2,
                    y2,
                    x,
                    y,
                } => {
                    out.extend_from_slice(
                        format!(
                            "{} {} {} {} {} {} c\n",
                            fmt_num(*x1),
                            fmt_num(*y1),
                            fmt_num(*x2),
                            fmt_num(*y2),
                            fmt_num(*x),
                            fmt_num(*y)
                        )
                        .as_bytes(),
                    );
                }
                Command::ClosePath => out.extend_from_slice(b"h\n"),
                Command::Stroke => out.extend_from_slice(b"S\n"),
                Command::FillStroke => out.extend_from_slice(b"B\n"),
                Command::DrawString {
                    x,
                    y,
                    font,
                    size,
                    text,
                } => {
                    out.extend_from_slice(b"BT\n");
                    out.extend_from_slice(format!("/{} {} Tf\n", font, fmt_num(*size)).as_bytes());
                    out.extend_from_slice(
                        format!("1 0 0 1 {} {} Tm\n", fmt_num(*x), fmt_num(*y)).as_bytes(),
                    );
                    out.push(b'(');
                    escape_pdf_string_bytes(text, &mut out);
                    out.extend_from_slice(b") Tj\nET\n");
                }
                Command::DrawImage {
                    x,
                    y,
                    width,
                    height,
                    resource,
                } => {
                    out.extend_from_slice(b"q\n");
                    out.extend_from_slice(
                        format!(
                            "{} 0 0 {} {} {} cm\n",
                            fmt_num(*width),
                            fmt_num(*height),
                            fmt_num(*x),
                            fmt_num(*y)
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(format!("/{} Do\n", resource).as_bytes());
                    out.extend_from_slice(b"Q\n");
                }
            }
        }
        out
    }
}

fn color_operands(color: Color) -> String {
    format!(
        "{} {} {}",
        fmt_num(f64::from(clamp_unit(color.r))),
        fmt_num(f64::from(clamp_unit(color.g))),
        fmt_num(f64::from(clamp_unit(color.b)))
    )
}

fn escape_pdf_string_bytes(input: &[u8], out: &mut Vec<u8>) {
    for &b in input {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            0x20..=0x7e => out.push(b),
            _ => out.extend_from_slice(format!("\\{:03o}", b).as_bytes()),
        }
    }
}
