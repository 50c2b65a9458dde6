//! Page readiness and print settings.

use derive_more::Display;
use std::str::FromStr;
use std::time::Duration;

/// Millimetres per inch; the DevTools print API measures paper in inches.
const MM_PER_INCH: f64 = 25.4;

/// The signal a page must reach before it is printed.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Readiness {
    /// The DOM has been parsed (`DOMContentLoaded`).
    #[display("content-loaded")]
    ContentLoaded,
    /// The `load` event fired and no further resources finished loading for
    /// [`NETWORK_IDLE_WINDOW`](Readiness::NETWORK_IDLE_WINDOW).
    #[display("network-idle")]
    NetworkIdle,
    /// The DOM has been parsed and every font face in use has loaded.
    #[default]
    #[display("fonts-ready")]
    FontsReady,
}
impl Readiness {
    pub const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

    /// JavaScript expression that resolves once the page reaches this state.
    pub(crate) fn script(self) -> String {
        const CONTENT_LOADED: &str = "new Promise((resolve) => document.readyState !== 'loading' \
            ? resolve() \
            : document.addEventListener('DOMContentLoaded', () => resolve(), { once: true }))";
        match self {
            Self::ContentLoaded => format!("{CONTENT_LOADED}.then(() => true)"),
            Self::FontsReady => format!("{CONTENT_LOADED}.then(() => document.fonts.ready).then(() => true)"),
            Self::NetworkIdle => format!(
                "new Promise((resolve) => {{
                    const settle = () => {{
                        let seen = performance.getEntriesByType('resource').length;
                        const tick = () => {{
                            const now = performance.getEntriesByType('resource').length;
                            if (now === seen) {{ resolve(true); }} else {{ seen = now; setTimeout(tick, {window}); }}
                        }};
                        setTimeout(tick, {window});
                    }};
                    if (document.readyState === 'complete') {{
                        settle();
                    }} else {{
                        window.addEventListener('load', settle, {{ once: true }});
                    }}
                }})",
                window = Self::NETWORK_IDLE_WINDOW.as_millis()
            ),
        }
    }
}
impl FromStr for Readiness {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "content-loaded" | "domcontentloaded" => Ok(Self::ContentLoaded),
            "network-idle" | "networkidle" => Ok(Self::NetworkIdle),
            "fonts-ready" => Ok(Self::FontsReady),
            other => Err(format!("unknown readiness policy: {other}")),
        }
    }
}

/// Page margins in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}
impl Default for Margins {
    fn default() -> Self {
        Self { top: 15.0, right: 10.0, bottom: 15.0, left: 10.0 }
    }
}
impl Margins {
    pub fn uniform(mm: f64) -> Self {
        Self { top: mm, right: mm, bottom: mm, left: mm }
    }

    pub(crate) fn inches(&self) -> [f64; 4] {
        [self.top, self.right, self.bottom, self.left].map(|mm| mm / MM_PER_INCH)
    }
}

/// Fixed paper size. Only A4 is produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaperSize {
    #[default]
    A4,
}
impl PaperSize {
    /// Width and height in millimetres.
    pub fn millimetres(self) -> (f64, f64) {
        match self {
            Self::A4 => (210.0, 297.0),
        }
    }

    pub(crate) fn inches(self) -> (f64, f64) {
        let (w, h) = self.millimetres();
        (w / MM_PER_INCH, h / MM_PER_INCH)
    }
}

/// How the loaded page is rasterised.
///
/// Background printing is always on: without it CSS colours and gradients
/// disappear from the output.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    paper: PaperSize,
    margins: Margins,
    scale: Option<f64>,
}
impl Default for RenderOptions {
    fn default() -> Self {
        Self { paper: PaperSize::A4, margins: Margins::default(), scale: None }
    }
}
impl RenderOptions {
    /// Smallest and largest scale factors Chrome accepts.
    pub const SCALE_RANGE: std::ops::RangeInclusive<f64> = 0.1..=2.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    /// Apply a uniform scale factor, clamped to [`SCALE_RANGE`](Self::SCALE_RANGE).
    pub fn with_scale(mut self, scale: impl Into<Option<f64>>) -> Self {
        self.scale = scale.into().map(|s| s.clamp(*Self::SCALE_RANGE.start(), *Self::SCALE_RANGE.end()));
        self
    }

    pub fn paper(&self) -> PaperSize {
        self.paper
    }

    pub fn margins(&self) -> &Margins {
        &self.margins
    }

    pub fn scale(&self) -> Option<f64> {
        self.scale
    }

    pub fn print_background(&self) -> bool {
        true
    }
}
