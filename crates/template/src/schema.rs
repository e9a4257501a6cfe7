//! Template JSON schema types

use serde::{Deserialize, Serialize};

/// RGB color (components 0.0 - 1.0)
///
/// Deserializes from `{ "r": .., "g": .., "b": .. }` or a `"#RRGGBB"` string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "ColorRepr")]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }

    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    pub fn gray(level: f64) -> Self {
        Self::rgb(level, level, level)
    }

    /// Parse `#RRGGBB` (leading `#` optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::from_rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub(crate) fn to_pdf(self) -> pdf_core::Color {
        pdf_core::Color::rgb(self.r as f32, self.g as f32, self.b as f32)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Rgb { r: f64, g: f64, b: f64 },
}

impl TryFrom<ColorRepr> for Color {
    type Error = String;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Hex(s) => Color::from_hex(&s).ok_or_else(|| format!("invalid color: {s}")),
            ColorRepr::Rgb { r, g, b } => Ok(Color::rgb(r, g, b)),
        }
    }
}

/// Physical page sizes in points
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    Letter,
    Legal,
}

impl PageSize {
    /// Portrait (width, height) in points
    pub fn dimensions(self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Which body renderer drives the template
///
/// Unknown tags map to [`StructureType::Other`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum StructureType {
    #[default]
    ListV1,
    CardsV1,
    LabelV1,
    Other,
}

impl From<String> for StructureType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "list_v1" => StructureType::ListV1,
            "cards_v1" => StructureType::CardsV1,
            "label_v1" => StructureType::LabelV1,
            _ => StructureType::Other,
        }
    }
}

impl From<StructureType> for String {
    fn from(kind: StructureType) -> Self {
        match kind {
            StructureType::ListV1 => "list_v1",
            StructureType::CardsV1 => "cards_v1",
            StructureType::LabelV1 => "label_v1",
            StructureType::Other => "other",
        }
        .to_string()
    }
}

/// Authoring-space canvas size
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

/// Optional explicit body limits in authoring units
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RegionBounds {
    #[serde(rename = "headerBottom")]
    #[serde(default)]
    pub header_bottom: Option<f64>,

    #[serde(rename = "footerTop")]
    #[serde(default)]
    pub footer_top: Option<f64>,
}

fn default_true() -> bool {
    true
}

/// Root template structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDefinition {
    #[serde(default)]
    pub id: String,

    #[serde(rename = "pageSize")]
    #[serde(default)]
    pub page_size: PageSize,

    #[serde(default)]
    pub orientation: Orientation,

    #[serde(rename = "structureType")]
    #[serde(default)]
    pub structure_type: StructureType,

    #[serde(default)]
    pub canvas: Option<CanvasSize>,

    #[serde(default)]
    pub elements: Vec<TemplateElement>,

    #[serde(rename = "regionBounds")]
    #[serde(default)]
    pub region_bounds: Option<RegionBounds>,

    #[serde(rename = "footerReserveHeight")]
    #[serde(default)]
    pub footer_reserve_height: Option<f64>,

    #[serde(default)]
    pub summary: Option<SummarySpec>,

    #[serde(rename = "labelSheet")]
    #[serde(default)]
    pub label_sheet: Option<LabelSheetSpec>,

    #[serde(rename = "showPageNumbers")]
    #[serde(default = "default_true")]
    pub show_page_numbers: bool,
}

impl Default for TemplateDefinition {
    fn default() -> Self {
        Self {
            id: String::new(),
            page_size: PageSize::default(),
            orientation: Orientation::default(),
            structure_type: StructureType::default(),
            canvas: None,
            elements: Vec::new(),
            region_bounds: None,
            footer_reserve_height: None,
            summary: None,
            label_sheet: None,
            show_page_numbers: true,
        }
    }
}

impl TemplateDefinition {
    /// Physical page size in points, orientation applied
    pub fn page_size_pt(&self) -> (f64, f64) {
        let (w, h) = self.page_size.dimensions();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    /// Authoring canvas, defaulting to the physical page size
    pub fn canvas_size(&self) -> (f64, f64) {
        match self.canvas {
            Some(c) => (c.width, c.height),
            None => self.page_size_pt(),
        }
    }

    pub fn is_label_sheet(&self) -> bool {
        self.structure_type == StructureType::LabelV1
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Header,
    #[default]
    Body,
    Footer,
}

/// Per-page repetition of header/footer elements
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Repeat {
    #[default]
    EveryPage,
    FirstPageOnly,
    LastPageOnly,
}

impl Repeat {
    /// Whether an element with this flag is drawn on `page` of `total`
    pub fn applies(self, page: usize, total: usize) -> bool {
        match self {
            Repeat::EveryPage => true,
            Repeat::FirstPageOnly => page == 1,
            Repeat::LastPageOnly => page == total,
        }
    }
}

/// Fields shared by every element
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementBase {
    pub id: String,

    #[serde(rename = "slotId")]
    #[serde(default)]
    pub slot_id: Option<String>,

    #[serde(default)]
    pub region: Region,

    #[serde(default)]
    pub position: Position,

    #[serde(default)]
    pub size: Size,

    #[serde(default)]
    pub repeat: Repeat,
}

impl ElementBase {
    pub fn bottom(&self) -> f64 {
        self.position.y + self.size.height
    }
}

/// Template element
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TemplateElement {
    Text(TextElement),
    Label(LabelElement),
    Image(ImageElement),
    Table(TableElement),
    CardList(CardListElement),
}

impl TemplateElement {
    pub fn base(&self) -> &ElementBase {
        match self {
            TemplateElement::Text(e) => &e.base,
            TemplateElement::Label(e) => &e.base,
            TemplateElement::Image(e) => &e.base,
            TemplateElement::Table(e) => &e.base,
            TemplateElement::CardList(e) => &e.base,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    pub fn region(&self) -> Region {
        self.base().region
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TemplateElement::Text(_) => "text",
            TemplateElement::Label(_) => "label",
            TemplateElement::Image(_) => "image",
            TemplateElement::Table(_) => "table",
            TemplateElement::CardList(_) => "cardList",
        }
    }

    pub fn as_table(&self) -> Option<&TableElement> {
        match self {
            TemplateElement::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_card_list(&self) -> Option<&CardListElement> {
        match self {
            TemplateElement::CardList(c) => Some(c),
            _ => None,
        }
    }

    /// Text, label and image elements; drawn once per page they apply to
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            TemplateElement::Text(_) | TemplateElement::Label(_) | TemplateElement::Image(_)
        )
    }
}

/// Where an element's value comes from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DataSource {
    #[serde(rename = "static")]
    Static {
        #[serde(default)]
        value: serde_json::Value,
    },

    #[serde(rename = "kintone")]
    Field {
        #[serde(rename = "fieldCode")]
        field_code: String,
    },

    #[serde(rename = "kintoneSubtable")]
    Subtable {
        #[serde(rename = "fieldCode")]
        field_code: String,
    },
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::Static {
            value: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    pub(crate) fn to_pdf(self) -> pdf_core::Align {
        match self {
            Align::Left => pdf_core::Align::Left,
            Align::Center => pdf_core::Align::Center,
            Align::Right => pdf_core::Align::Right,
        }
    }
}

/// How text that is wider than its box is handled
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    #[default]
    Wrap,
    Shrink,
    Ellipsis,
    Clip,
}

/// Display format applied to resolved values
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    #[default]
    Text,
    Number,
    Currency,
    Date,
}

fn default_font_size() -> f64 {
    10.0
}

fn default_min_font_size() -> f64 {
    6.0
}

fn default_shrink() -> Overflow {
    Overflow::Shrink
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextElement {
    #[serde(flatten)]
    pub base: ElementBase,

    #[serde(rename = "dataSource")]
    #[serde(default)]
    pub data_source: DataSource,

    #[serde(rename = "fontSize")]
    #[serde(default = "default_font_size")]
    pub font_size: f64,

    #[serde(rename = "minFontSize")]
    #[serde(default = "default_min_font_size")]
    pub min_font_size: f64,

    #[serde(default)]
    pub align: Option<Align>,

    #[serde(default)]
    pub color: Option<Color>,

    #[serde(default)]
    pub format: FieldFormat,

    #[serde(default)]
    pub overflow: Overflow,
}

/// Fixed caption, optionally boxed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelElement {
    #[serde(flatten)]
    pub base: ElementBase,

    #[serde(default)]
    pub text: String,

    #[serde(rename = "fontSize")]
    #[serde(default = "default_font_size")]
    pub font_size: f64,

    #[serde(rename = "minFontSize")]
    #[serde(default = "default_min_font_size")]
    pub min_font_size: f64,

    #[serde(default)]
    pub align: Option<Align>,

    #[serde(default)]
    pub color: Option<Color>,

    #[serde(rename = "fillColor")]
    #[serde(default)]
    pub fill_color: Option<Color>,

    #[serde(rename = "borderColor")]
    #[serde(default)]
    pub border_color: Option<Color>,

    #[serde(default = "default_shrink")]
    pub overflow: Overflow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageElement {
    #[serde(flatten)]
    pub base: ElementBase,

    #[serde(rename = "dataSource")]
    #[serde(default)]
    pub data_source: DataSource,
}

fn default_table_font_size() -> f64 {
    9.0
}

fn default_row_height() -> f64 {
    18.0
}

fn default_header_height() -> f64 {
    20.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableElement {
    #[serde(flatten)]
    pub base: ElementBase,

    #[serde(rename = "dataSource")]
    #[serde(default)]
    pub data_source: DataSource,

    #[serde(default)]
    pub columns: Vec<TableColumn>,

    #[serde(rename = "fontSize")]
    #[serde(default = "default_table_font_size")]
    pub font_size: f64,

    #[serde(rename = "headerFontSize")]
    #[serde(default)]
    pub header_font_size: Option<f64>,

    #[serde(rename = "rowHeight")]
    #[serde(default = "default_row_height")]
    pub row_height: f64,

    #[serde(rename = "headerHeight")]
    #[serde(default = "default_header_height")]
    pub header_height: f64,

    #[serde(rename = "headerFill")]
    #[serde(default)]
    pub header_fill: Option<Color>,

    #[serde(rename = "borderColor")]
    #[serde(default)]
    pub border_color: Option<Color>,

    #[serde(rename = "showHeader")]
    #[serde(default = "default_true")]
    pub show_header: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableColumn {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(rename = "fieldCode")]
    #[serde(default)]
    pub field_code: Option<String>,

    /// Width in authoring units; unset columns share the remaining width
    #[serde(default)]
    pub width: Option<f64>,

    #[serde(default)]
    pub align: Option<Align>,

    #[serde(default)]
    pub overflow: Overflow,

    #[serde(default)]
    pub format: FieldFormat,

    #[serde(rename = "minFontSize")]
    #[serde(default = "default_min_font_size")]
    pub min_font_size: f64,
}

fn default_card_height() -> f64 {
    80.0
}

fn default_card_gap() -> f64 {
    8.0
}

fn default_card_padding() -> f64 {
    6.0
}

fn default_title_font_size() -> f64 {
    14.0
}

fn default_card_body_font_size() -> f64 {
    9.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardListElement {
    #[serde(flatten)]
    pub base: ElementBase,

    #[serde(rename = "dataSource")]
    #[serde(default)]
    pub data_source: DataSource,

    #[serde(default)]
    pub fields: Vec<CardField>,

    #[serde(rename = "cardHeight")]
    #[serde(default = "default_card_height")]
    pub card_height: f64,

    #[serde(default = "default_card_gap")]
    pub gap: f64,

    #[serde(default = "default_card_padding")]
    pub padding: f64,

    #[serde(rename = "cornerRadius")]
    #[serde(default = "default_card_padding")]
    pub corner_radius: f64,

    #[serde(rename = "fillColor")]
    #[serde(default)]
    pub fill_color: Option<Color>,

    #[serde(rename = "borderColor")]
    #[serde(default)]
    pub border_color: Option<Color>,

    #[serde(rename = "titleFontSize")]
    #[serde(default = "default_title_font_size")]
    pub title_font_size: f64,

    #[serde(rename = "bodyFontSize")]
    #[serde(default = "default_card_body_font_size")]
    pub body_font_size: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardField {
    pub id: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(rename = "fieldCode")]
    #[serde(default)]
    pub field_code: Option<String>,

    #[serde(default)]
    pub format: FieldFormat,
}

impl CardField {
    /// Bound to a non-empty field code
    pub fn is_active(&self) -> bool {
        self.field_code.as_deref().is_some_and(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SummaryMode {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "lastPageOnly")]
    LastPageOnly,
    #[serde(rename = "everyPageSubtotal+lastTotal")]
    EveryPageSubtotalLastTotal,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummaryOp {
    #[default]
    Sum,
    Static,
}

/// Which trailer blocks a summary row appears in
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    Subtotal,
    Total,
    #[default]
    Both,
}

impl SummaryKind {
    pub fn in_subtotal(self) -> bool {
        matches!(self, SummaryKind::Subtotal | SummaryKind::Both)
    }

    pub fn in_total(self) -> bool {
        matches!(self, SummaryKind::Total | SummaryKind::Both)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(default)]
    pub op: SummaryOp,

    #[serde(rename = "columnId")]
    pub column_id: String,

    /// Summed field; defaults to the target column's field code
    #[serde(rename = "fieldCode")]
    #[serde(default)]
    pub field_code: Option<String>,

    #[serde(default)]
    pub kind: SummaryKind,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(rename = "subtotalLabel")]
    #[serde(default)]
    pub subtotal_label: Option<String>,

    #[serde(rename = "totalLabel")]
    #[serde(default)]
    pub total_label: Option<String>,

    /// Literal text for `static` rows
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SummaryStyle {
    #[serde(rename = "fillColor")]
    #[serde(default)]
    pub fill_color: Option<Color>,

    #[serde(rename = "borderColor")]
    #[serde(default)]
    pub border_color: Option<Color>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummarySpec {
    #[serde(default)]
    pub mode: SummaryMode,

    #[serde(default)]
    pub rows: Vec<SummaryRow>,

    #[serde(default)]
    pub style: SummaryStyle,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MarginsMm {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub right: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub left: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct OffsetMm {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Record fields feeding each label
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelMapping {
    #[serde(rename = "titleField")]
    #[serde(default)]
    pub title_field: Option<String>,

    /// At most three are printed
    #[serde(rename = "subFields")]
    #[serde(default)]
    pub sub_fields: Vec<String>,

    #[serde(rename = "qrField")]
    #[serde(default)]
    pub qr_field: Option<String>,

    #[serde(rename = "copiesField")]
    #[serde(default)]
    pub copies_field: Option<String>,
}

fn default_label_title_size() -> f64 {
    12.0
}

fn default_label_sub_size() -> f64 {
    8.0
}

/// Physical label sheet geometry, in millimetres
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelSheetSpec {
    #[serde(rename = "paperWidthMm")]
    pub paper_width_mm: f64,

    #[serde(rename = "paperHeightMm")]
    pub paper_height_mm: f64,

    pub cols: u32,
    pub rows: u32,

    #[serde(rename = "marginMm")]
    #[serde(default)]
    pub margin_mm: MarginsMm,

    #[serde(rename = "gapMm")]
    #[serde(default)]
    pub gap_mm: OffsetMm,

    #[serde(rename = "offsetMm")]
    #[serde(default)]
    pub offset_mm: OffsetMm,

    #[serde(default)]
    pub mapping: LabelMapping,

    /// Points
    #[serde(rename = "titleFontSize")]
    #[serde(default = "default_label_title_size")]
    pub title_font_size: f64,

    /// Points
    #[serde(rename = "subFontSize")]
    #[serde(default = "default_label_sub_size")]
    pub sub_font_size: f64,

    #[serde(rename = "showBorders")]
    #[serde(default)]
    pub show_borders: bool,
}

/// Data record: field code -> value
pub type TemplateDataRecord = serde_json::Map<String, serde_json::Value>;

/// What data-bound elements display
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PreviewMode {
    /// Resolved record values
    #[default]
    Record,
    /// The field codes themselves
    FieldCode,
}
