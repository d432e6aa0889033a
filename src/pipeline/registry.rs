//! Category Schema Registry.
//!
//! One static entry per document category that the pipeline knows how to
//! extract: the expected field set, the prompt handed to the vision model,
//! and the CSV projection used at export time. Dispatch and export consult
//! this table and nothing else; adding a category means adding an entry
//! here, not touching the dispatcher or the exporter.
//!
//! Categories without an entry degrade: extraction reports an unsupported
//! category (the processor falls back to raw text), and export emits the
//! generic two-column row.

use chrono::NaiveDate;

use super::prompts;
use crate::models::DocumentCategory;

/// First CSV column on every row; disambiguates row shape in a mixed export.
pub const KIND_COLUMN: &str = "区分";
/// Last CSV column on every row; the source filename annotation.
pub const SOURCE_FILE_COLUMN: &str = "元ファイル";
/// Payload column of the generic fallback projection.
pub const GENERIC_DATA_COLUMN: &str = "データ";

/// Semantic type of an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Number,
    Date,
    TextList,
}

/// An expected field in a category's extraction output.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

/// How the extraction prompt for a category is obtained.
#[derive(Debug, Clone, Copy)]
pub enum PromptSpec {
    Static(&'static str),
    /// Built at call time: embeds the current year for era conversion.
    Passbook,
}

/// Value used when a projected field is missing from the extracted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvDefault {
    Empty,
    Zero,
}

/// One CSV column fed from one extracted field.
#[derive(Debug, Clone, Copy)]
pub struct CsvField {
    pub column: &'static str,
    pub source: &'static str,
    pub default: CsvDefault,
}

const fn csv_field(column: &'static str, source: &'static str, default: CsvDefault) -> CsvField {
    CsvField {
        column,
        source,
        default,
    }
}

/// How a document of this category becomes CSV rows.
#[derive(Debug, Clone, Copy)]
pub enum Projection {
    /// One row per document, fields read from the extracted object.
    PerDocument(&'static [CsvField]),
    /// One row per element of the extracted transaction array. Passbooks are
    /// the only category with this one-to-many expansion.
    PerTransaction(&'static [CsvField]),
}

impl Projection {
    pub fn fields(&self) -> &'static [CsvField] {
        match self {
            Self::PerDocument(fields) | Self::PerTransaction(fields) => fields,
        }
    }
}

/// Registry entry for one document category.
#[derive(Debug, Clone, Copy)]
pub struct CategorySchema {
    pub category: DocumentCategory,
    /// 区分 value written on this category's CSV rows.
    pub csv_label: &'static str,
    pub fields: &'static [FieldSpec],
    pub prompt: PromptSpec,
    /// Field whose value names the document in a renamed filename.
    pub title_field: Option<&'static str>,
    /// None: exported via the generic fallback row.
    pub projection: Option<Projection>,
}

// ──────────────────────────────────────────────
// Entries
// ──────────────────────────────────────────────

static PASSBOOK_SCHEMA: CategorySchema = CategorySchema {
    category: DocumentCategory::Passbook,
    csv_label: "通帳",
    fields: &[
        field("取引日", FieldKind::Date),
        field("出金額", FieldKind::Integer),
        field("入金額", FieldKind::Integer),
        field("残高", FieldKind::Integer),
        field("取引内容", FieldKind::Text),
    ],
    prompt: PromptSpec::Passbook,
    title_field: None,
    projection: Some(Projection::PerTransaction(&[
        csv_field("取引日", "取引日", CsvDefault::Empty),
        csv_field("出金額", "出金額", CsvDefault::Zero),
        csv_field("入金額", "入金額", CsvDefault::Zero),
        csv_field("残高", "残高", CsvDefault::Zero),
        csv_field("取引内容", "取引内容", CsvDefault::Empty),
    ])),
};

static DEPOSIT_SCHEMA: CategorySchema = CategorySchema {
    category: DocumentCategory::Deposit,
    csv_label: "預貯金",
    fields: &[
        field("financial_institution", FieldKind::Text),
        field("branch", FieldKind::Text),
        field("account_type", FieldKind::Text),
        field("account_number", FieldKind::Text),
        field("balance", FieldKind::Integer),
        field("accrued_interest", FieldKind::Integer),
    ],
    prompt: PromptSpec::Static(prompts::DEPOSIT_PROMPT),
    title_field: Some("financial_institution"),
    projection: Some(Projection::PerDocument(&[
        csv_field("金融機関", "financial_institution", CsvDefault::Empty),
        csv_field("支店", "branch", CsvDefault::Empty),
        csv_field("種類", "account_type", CsvDefault::Empty),
        csv_field("口座番号", "account_number", CsvDefault::Empty),
        csv_field("残高", "balance", CsvDefault::Zero),
        csv_field("既経過利子", "accrued_interest", CsvDefault::Zero),
    ])),
};

static LISTED_STOCK_SCHEMA: CategorySchema = CategorySchema {
    category: DocumentCategory::ListedStock,
    csv_label: "上場株式",
    fields: &[
        field("stock_name", FieldKind::Text),
        field("securities_company", FieldKind::Text),
        field("branch_name", FieldKind::Text),
        field("valuation", FieldKind::Integer),
        field("quantity", FieldKind::Number),
    ],
    prompt: PromptSpec::Static(prompts::STOCK_PROMPT),
    title_field: Some("stock_name"),
    projection: Some(Projection::PerDocument(&[
        csv_field("銘柄名", "stock_name", CsvDefault::Empty),
        csv_field("証券会社", "securities_company", CsvDefault::Empty),
        csv_field("支店名", "branch_name", CsvDefault::Empty),
        csv_field("評価額", "valuation", CsvDefault::Zero),
        csv_field("株式数", "quantity", CsvDefault::Zero),
    ])),
};

static LIFE_INSURANCE_SCHEMA: CategorySchema = CategorySchema {
    category: DocumentCategory::LifeInsurance,
    csv_label: "生命保険",
    fields: &[
        field("insurance_company", FieldKind::Text),
        field("policy_number", FieldKind::Text),
        field("policyholder", FieldKind::Text),
        field("insured", FieldKind::Text),
        field("beneficiary", FieldKind::Text),
        field("receipt_date", FieldKind::Date),
        field("insurance_amount", FieldKind::Integer),
        field("surrender_value", FieldKind::Integer),
    ],
    prompt: PromptSpec::Static(prompts::INSURANCE_PROMPT),
    title_field: Some("insurance_company"),
    projection: None,
};

static LAND_BUILDING_SCHEMA: CategorySchema = CategorySchema {
    category: DocumentCategory::LandBuilding,
    csv_label: "土地・建物",
    fields: &[
        field("prefecture", FieldKind::Text),
        field("city", FieldKind::Text),
        field("address", FieldKind::Text),
        field("lot_number", FieldKind::Text),
        field("house_number", FieldKind::Text),
        field("registered_land_category", FieldKind::Text),
        field("taxed_land_category", FieldKind::Text),
        field("ownership_ratio", FieldKind::Text),
        field("area", FieldKind::Number),
        field("site_right_ratio", FieldKind::Text),
        field("fixed_asset_tax_value", FieldKind::Integer),
        field("owner_names", FieldKind::TextList),
    ],
    prompt: PromptSpec::Static(prompts::LAND_BUILDING_PROMPT),
    title_field: Some("city"),
    projection: Some(Projection::PerDocument(&[
        csv_field("都道府県", "prefecture", CsvDefault::Empty),
        csv_field("市区町村", "city", CsvDefault::Empty),
        csv_field("大字・丁目", "address", CsvDefault::Empty),
        csv_field("地番", "lot_number", CsvDefault::Empty),
        csv_field("家屋番号", "house_number", CsvDefault::Empty),
        csv_field("登記地目", "registered_land_category", CsvDefault::Empty),
        csv_field("課税地目", "taxed_land_category", CsvDefault::Empty),
        csv_field("持分", "ownership_ratio", CsvDefault::Empty),
        csv_field("地積", "area", CsvDefault::Zero),
        csv_field("敷地権割合", "site_right_ratio", CsvDefault::Empty),
        csv_field("固定資産税評価額", "fixed_asset_tax_value", CsvDefault::Zero),
    ])),
};

// ──────────────────────────────────────────────
// Lookup
// ──────────────────────────────────────────────

/// Registry entry for a category, if one exists.
pub fn schema_for(category: DocumentCategory) -> Option<&'static CategorySchema> {
    match category {
        DocumentCategory::Passbook => Some(&PASSBOOK_SCHEMA),
        DocumentCategory::Deposit => Some(&DEPOSIT_SCHEMA),
        DocumentCategory::ListedStock => Some(&LISTED_STOCK_SCHEMA),
        DocumentCategory::LifeInsurance => Some(&LIFE_INSURANCE_SCHEMA),
        DocumentCategory::LandBuilding => Some(&LAND_BUILDING_SCHEMA),
        _ => None,
    }
}

/// Extraction prompt for a category, if a schema is registered.
pub fn extraction_prompt(
    category: DocumentCategory,
    today: NaiveDate,
    include_handwriting: bool,
) -> Option<String> {
    schema_for(category).map(|schema| match schema.prompt {
        PromptSpec::Static(text) => text.to_string(),
        PromptSpec::Passbook => prompts::passbook_prompt(today, include_handwriting),
    })
}

/// CSV projection for a category, if one is registered.
pub fn csv_projection(category: DocumentCategory) -> Option<(&'static str, &'static Projection)> {
    schema_for(category).and_then(|schema| {
        schema
            .projection
            .as_ref()
            .map(|projection| (schema.csv_label, projection))
    })
}

/// Full CSV column list for a category: 区分 first, 元ファイル last, with the
/// generic two-column shape for anything without a registered projection.
pub fn csv_columns(category: DocumentCategory) -> Vec<&'static str> {
    let mut columns = vec![KIND_COLUMN];
    match csv_projection(category) {
        Some((_, projection)) => {
            columns.extend(projection.fields().iter().map(|f| f.column));
        }
        None => columns.push(GENERIC_DATA_COLUMN),
    }
    columns.push(SOURCE_FILE_COLUMN);
    columns
}
