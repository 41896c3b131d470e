//! Encapsulated PostScript drawing backend for `plotters`.
//!
//! Text is set in Helvetica re-encoded to ISO Latin-1, so accented axis
//! labels survive; characters outside Latin-1 are replaced with `?`.

use std::{
    fmt::Write as _,
    fs, io,
    path::{Path, PathBuf},
};

use plotters_backend::{
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend, DrawingErrorKind,
    FontTransform,
    text_anchor::{HPos, VPos},
};

const FONT: &str = "Helvetica-Latin1";

pub struct EpsBackend {
    path: PathBuf,
    size: (u32, u32),
    body: String,
}

impl EpsBackend {
    /// `size` is in PostScript points.
    pub fn new(path: impl AsRef<Path>, size: (u32, u32)) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            size,
            body: String::new(),
        }
    }

    fn flip(&self, (x, y): BackendCoord) -> (i32, i32) {
        (x, self.size.1 as i32 - y)
    }

    fn emit(&mut self, args: std::fmt::Arguments<'_>) {
        let _ = self.body.write_fmt(args);
        self.body.push('\n');
    }

    // Returns false for fully transparent colors, which draw nothing.
    fn set_color(&mut self, color: BackendColor) -> bool {
        if color.alpha <= 0.0 {
            return false;
        }
        let (r, g, b) = color.rgb;
        self.emit(format_args!(
            "{:.3} {:.3} {:.3} setrgbcolor",
            r as f64 / 255.0,
            g as f64 / 255.0,
            b as f64 / 255.0
        ));
        true
    }

    fn set_stroke<S: BackendStyle>(&mut self, style: &S) -> bool {
        if !self.set_color(style.color()) {
            return false;
        }
        self.emit(format_args!("{} setlinewidth", style.stroke_width().max(1)));
        true
    }

    fn path<I: IntoIterator<Item = BackendCoord>>(&mut self, points: I) -> bool {
        let mut first = true;
        for point in points {
            let (x, y) = self.flip(point);
            if first {
                self.emit(format_args!("newpath {x} {y} moveto"));
                first = false;
            } else {
                self.emit(format_args!("{x} {y} lineto"));
            }
        }
        !first
    }

    fn document(&self) -> String {
        let (w, h) = self.size;
        let mut doc = String::with_capacity(self.body.len() + 512);
        doc.push_str("%!PS-Adobe-3.0 EPSF-3.0\n");
        let _ = writeln!(doc, "%%BoundingBox: 0 0 {w} {h}");
        doc.push_str("%%Creator: radon-dashboard\n%%EndComments\n");
        let _ = writeln!(
            doc,
            "/Helvetica findfont dup length dict begin \
             {{1 index /FID ne {{def}} {{pop pop}} ifelse}} forall \
             /Encoding ISOLatin1Encoding def currentdict end /{FONT} exch definefont pop"
        );
        doc.push_str("1 setlinejoin 1 setlinecap\n");
        doc.push_str(&self.body);
        doc.push_str("showpage\n%%EOF\n");
        doc
    }

}

impl DrawingBackend for EpsBackend {
    type ErrorType = io::Error;

    fn get_size(&self) -> (u32, u32) {
        self.size
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<io::Error>> {
        Ok(())
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<io::Error>> {
        fs::write(&self.path, self.document()).map_err(DrawingErrorKind::DrawingError)
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        if self.set_color(color) {
            let (x, y) = self.flip(point);
            self.emit(format_args!("{x} {} 1 1 rectfill", y - 1));
        }
        Ok(())
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        if self.set_stroke(style) && self.path([from, to]) {
            self.emit(format_args!("stroke"));
        }
        Ok(())
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        let ok = if fill {
            self.set_color(style.color())
        } else {
            self.set_stroke(style)
        };
        if ok {
            let (x0, y0) = self.flip(upper_left);
            let (x1, y1) = self.flip(bottom_right);
            let op = if fill { "rectfill" } else { "rectstroke" };
            self.emit(format_args!("{} {} {} {} {op}", x0, y1, x1 - x0, y0 - y1));
        }
        Ok(())
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        if self.set_stroke(style) && self.path(path) {
            self.emit(format_args!("stroke"));
        }
        Ok(())
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        let ok = if fill {
            self.set_color(style.color())
        } else {
            self.set_stroke(style)
        };
        if ok {
            let (x, y) = self.flip(center);
            let op = if fill { "fill" } else { "stroke" };
            self.emit(format_args!("newpath {x} {y} {radius} 0 360 arc closepath {op}"));
        }
        Ok(())
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        if self.set_color(style.color()) && self.path(vert) {
            self.emit(format_args!("closepath fill"));
        }
        Ok(())
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        if text.is_empty() || !self.set_color(style.color()) {
            return Ok(());
        }
        let size = style.size();
        let (x, y) = self.flip(pos);
        // Screen rotation is clockwise with y pointing down; PostScript is the mirror.
        let angle = match style.transform() {
            FontTransform::None => 0,
            FontTransform::Rotate90 => -90,
            FontTransform::Rotate180 => 180,
            FontTransform::Rotate270 => 90,
        };
        let anchor = style.anchor();
        let dx = match anchor.h_pos {
            HPos::Left => "pop 0",
            HPos::Center => "2 div neg",
            HPos::Right => "neg",
        };
        let dy = match anchor.v_pos {
            VPos::Top => -0.75 * size,
            VPos::Center => -0.35 * size,
            VPos::Bottom => 0.0,
        };
        let escaped = escape_latin1(text);
        self.emit(format_args!(
            "gsave /{FONT} findfont {size:.1} scalefont setfont {x} {y} translate {angle} rotate \
             ({escaped}) dup stringwidth pop {dx} {dy:.2} moveto show grestore"
        ));
        Ok(())
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<io::Error>> {
        // Helvetica averages a little over half an em per glyph.
        let size = style.size();
        let w = (text.chars().count() as f64 * size * 0.56).ceil() as u32;
        let h = size.ceil() as u32;
        Ok(match style.transform() {
            FontTransform::Rotate90 | FontTransform::Rotate270 => (h, w),
            _ => (w, h),
        })
    }
}

fn escape_latin1(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            '\u{a0}'..='\u{ff}' => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            _ => out.push('?'),
        }
    }
    out
}
