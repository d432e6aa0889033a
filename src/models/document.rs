//! Core document types: category enumeration, processed-document record,
//! and the typed passbook ledger row.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ═══════════════════════════════════════════
// Document category
// ═══════════════════════════════════════════

/// The 13 property categories an inheritance-tax filing document can fall
/// into. Classification assigns exactly one; the category decides which
/// extraction schema and CSV projection apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentCategory {
    /// 登記簿謄本、名寄帳、固定資産税通知書、評価証明書
    LandBuilding,
    /// 証券会社の報告書、株式・投資信託の残高証明書
    ListedStock,
    /// 出資証明書、非上場株式の証明書
    OtherInvestment,
    /// 国債・社債の証券、債券証明書
    PublicBond,
    /// 銀行・郵便局の預金残高証明書
    Deposit,
    /// 生命保険証券、解約返戻金証明書
    LifeInsurance,
    /// 死亡退職金支払調書
    DeathRetirement,
    /// 骨董品鑑定書、車検証、その他財産証明書
    OtherProperty,
    /// 借入金残高証明書、未払金通知、病院の領収書
    Debt,
    /// 葬儀費用領収書、お布施メモ
    FuneralExpense,
    /// 通帳、取引履歴
    Passbook,
    /// 戸籍謄本・抄本、法定相続情報一覧図、印鑑証明書、住民票
    ProcedureDoc,
    /// 上記のどれにも該当しない書類
    Unknown,
}

impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LandBuilding => "LAND_BUILDING",
            Self::ListedStock => "LISTED_STOCK",
            Self::OtherInvestment => "OTHER_INVESTMENT",
            Self::PublicBond => "PUBLIC_BOND",
            Self::Deposit => "DEPOSIT",
            Self::LifeInsurance => "LIFE_INSURANCE",
            Self::DeathRetirement => "DEATH_RETIREMENT",
            Self::OtherProperty => "OTHER_PROPERTY",
            Self::Debt => "DEBT",
            Self::FuneralExpense => "FUNERAL_EXPENSE",
            Self::Passbook => "PASSBOOK",
            Self::ProcedureDoc => "PROCEDURE_DOC",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "LAND_BUILDING" => Some(Self::LandBuilding),
            "LISTED_STOCK" => Some(Self::ListedStock),
            "OTHER_INVESTMENT" => Some(Self::OtherInvestment),
            "PUBLIC_BOND" => Some(Self::PublicBond),
            "DEPOSIT" => Some(Self::Deposit),
            "LIFE_INSURANCE" => Some(Self::LifeInsurance),
            "DEATH_RETIREMENT" => Some(Self::DeathRetirement),
            "OTHER_PROPERTY" => Some(Self::OtherProperty),
            "DEBT" => Some(Self::Debt),
            "FUNERAL_EXPENSE" => Some(Self::FuneralExpense),
            "PASSBOOK" => Some(Self::Passbook),
            "PROCEDURE_DOC" => Some(Self::ProcedureDoc),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Short filing code used in document ids and renamed filenames.
    pub fn code(&self) -> &'static str {
        match self {
            Self::LandBuilding => "L",
            Self::ListedStock => "S",
            Self::OtherInvestment => "OI",
            Self::PublicBond => "PB",
            Self::Deposit => "D",
            Self::LifeInsurance => "I",
            Self::DeathRetirement => "DR",
            Self::OtherProperty => "O",
            Self::Debt => "C",
            Self::FuneralExpense => "F",
            Self::Passbook => "T",
            Self::ProcedureDoc => "P",
            Self::Unknown => "U",
        }
    }

    /// Japanese property-category label shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LandBuilding => "土地・建物",
            Self::ListedStock => "上場株式・投資信託",
            Self::OtherInvestment => "その他出資金",
            Self::PublicBond => "公社債",
            Self::Deposit => "預貯金",
            Self::LifeInsurance => "生命保険",
            Self::DeathRetirement => "死亡退職金",
            Self::OtherProperty => "その他財産",
            Self::Debt => "債務",
            Self::FuneralExpense => "葬式費用",
            Self::Passbook => "通帳",
            Self::ProcedureDoc => "手続き関係書類",
            Self::Unknown => "不明書類",
        }
    }

    pub fn all() -> &'static [DocumentCategory] {
        &[
            Self::LandBuilding,
            Self::ListedStock,
            Self::OtherInvestment,
            Self::PublicBond,
            Self::Deposit,
            Self::LifeInsurance,
            Self::DeathRetirement,
            Self::OtherProperty,
            Self::Debt,
            Self::FuneralExpense,
            Self::Passbook,
            Self::ProcedureDoc,
            Self::Unknown,
        ]
    }
}

impl std::fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Processed document
// ═══════════════════════════════════════════

/// A document that went through classification and extraction.
///
/// `extracted_data` is an open mapping whose shape is decided by the
/// category's schema (an object for certificate-like documents, an array of
/// ledger rows for passbooks). `manual_edits` is the cumulative record of
/// every human correction, kept separately so the machine output is never
/// lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub id: String,
    pub original_filename: String,
    #[serde(default)]
    pub renamed_filename: Option<String>,
    pub category: DocumentCategory,
    #[serde(default)]
    pub extracted_data: Value,
    #[serde(default)]
    pub ocr_confidence: Option<f32>,
    pub processed_at: NaiveDateTime,
    #[serde(default)]
    pub manual_edits: serde_json::Map<String, Value>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Build a collision-free document id.
///
/// The category code and filename keep ids human-scannable; the uuid token
/// makes two uploads of the same file within one clock tick distinct.
pub fn new_document_id(category: DocumentCategory, filename: &str) -> String {
    format!("{}_{}_{}", category.code(), filename, Uuid::new_v4().simple())
}

// ═══════════════════════════════════════════
// Passbook transaction
// ═══════════════════════════════════════════

/// One ledger row extracted from a passbook page, in physical row order.
///
/// Wire keys are the Japanese column names the vision model is instructed to
/// emit. Amounts the model could not read arrive masked and are normalized
/// to 0 by the extraction prompt; dates and balances it could not determine
/// arrive as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassbookTransaction {
    #[serde(rename = "取引日", default, deserialize_with = "lenient_date")]
    pub transaction_date: Option<NaiveDate>,
    #[serde(rename = "出金額", default, deserialize_with = "lenient_amount")]
    pub withdrawal: u64,
    #[serde(rename = "入金額", default, deserialize_with = "lenient_amount")]
    pub deposit: u64,
    #[serde(rename = "残高", default, deserialize_with = "lenient_balance")]
    pub balance: Option<i64>,
    #[serde(rename = "取引内容", default, deserialize_with = "lenient_text")]
    pub description: String,
}

/// Accept `yyyy-mm-dd`, null, or unparseable junk (mapped to None).
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()))
}

/// Accept a non-negative integer, null, or a non-numeric value (mapped to 0).
fn lenient_amount<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_u64).unwrap_or(0))
}

/// Accept an integer balance or null.
fn lenient_balance<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_i64))
}

/// Accept a string or null (mapped to an empty description).
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrips_through_as_str() {
        for category in DocumentCategory::all() {
            assert_eq!(DocumentCategory::from_str(category.as_str()), Some(*category));
        }
    }

    #[test]
    fn all_categories_has_thirteen_members() {
        assert_eq!(DocumentCategory::all().len(), 13);
    }

    #[test]
    fn category_codes_are_unique() {
        let mut codes: Vec<&str> = DocumentCategory::all().iter().map(|c| c.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 13);
    }

    #[test]
    fn category_serde_uses_wire_names() {
        let json = serde_json::to_string(&DocumentCategory::LandBuilding).unwrap();
        assert_eq!(json, "\"LAND_BUILDING\"");
        let parsed: DocumentCategory = serde_json::from_str("\"PASSBOOK\"").unwrap();
        assert_eq!(parsed, DocumentCategory::Passbook);
    }

    #[test]
    fn document_ids_never_collide_for_same_input() {
        let a = new_document_id(DocumentCategory::Passbook, "通帳1.jpg");
        let b = new_document_id(DocumentCategory::Passbook, "通帳1.jpg");
        assert_ne!(a, b);
        assert!(a.starts_with("T_通帳1.jpg_"));
    }

    #[test]
    fn passbook_transaction_parses_wire_keys() {
        let tx: PassbookTransaction = serde_json::from_value(serde_json::json!({
            "取引日": "2025-04-01",
            "出金額": 0,
            "入金額": 50000,
            "残高": 150000,
            "取引内容": "給与"
        }))
        .unwrap();
        assert_eq!(tx.transaction_date, Some(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()));
        assert_eq!(tx.deposit, 50000);
        assert_eq!(tx.withdrawal, 0);
        assert_eq!(tx.balance, Some(150000));
        assert_eq!(tx.description, "給与");
    }

    #[test]
    fn passbook_transaction_tolerates_nulls_and_junk() {
        let tx: PassbookTransaction = serde_json::from_value(serde_json::json!({
            "取引日": "令和7年4月1日",
            "出金額": null,
            "入金額": "***",
            "残高": null,
            "取引内容": null
        }))
        .unwrap();
        assert_eq!(tx.transaction_date, None);
        assert_eq!(tx.withdrawal, 0);
        assert_eq!(tx.deposit, 0);
        assert_eq!(tx.balance, None);
        assert!(tx.description.is_empty());
    }

    #[test]
    fn passbook_transaction_missing_keys_default() {
        let tx: PassbookTransaction = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(tx.withdrawal, 0);
        assert_eq!(tx.deposit, 0);
        assert_eq!(tx.balance, None);
    }

    #[test]
    fn passbook_transaction_serializes_back_to_wire_keys() {
        let tx = PassbookTransaction {
            transaction_date: NaiveDate::from_ymd_opt(2025, 4, 1),
            withdrawal: 300,
            deposit: 0,
            balance: Some(99700),
            description: "振込".to_string(),
        };
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["取引日"], "2025-04-01");
        assert_eq!(value["出金額"], 300);
        assert_eq!(value["残高"], 99700);
    }
}
