//! Prompt templates handed to the vision-language collaborator.
//!
//! One template per registered extraction schema plus the classification
//! prompt and a generic text-extraction fallback. The passbook template is
//! built at call time because it embeds the current calendar year (the model
//! must convert Japanese-era dates printed in the ledger to Western dates).

use chrono::{Datelike, NaiveDate};

/// First year of the Reiwa era (令和元年 = 2019).
const REIWA_START_YEAR: i32 = 2019;

/// 濁点・半濁点 confusion is the dominant failure mode on Japanese ledgers;
/// every passbook prompt carries this instruction.
const DAKUTEN_INSTRUCTION: &str = "日本語の文字認識、特に濁点（゛）や半濁点（゜）の識別は非常に重要です。
例えば、「シ」と「ジ」、「ハ」と「バ」と「パ」、「カ」と「ガ」、「タ」と「ダ」などを正確に見分けてください。";

/// Build the passbook transaction-extraction prompt.
pub fn passbook_prompt(today: NaiveDate, include_handwriting: bool) -> String {
    let current_year = today.year();
    let current_reiwa_year = current_year - REIWA_START_YEAR + 1;

    let handwriting_instruction = if include_handwriting {
        "手書きの文字や数字も認識に含めてください。"
    } else {
        "手書きと思われる文字や数字は無視し、印字された文字を中心に認識してください。"
    };

    format!(
        r#"この通帳の画像から取引明細を抽出してください。画像の最下部まで、全ての行を注意深く読み取ってください。
{DAKUTEN_INSTRUCTION}

以下のJSONスキーマに厳密に従って結果を返してください。
各取引について、取引日（yyyy-mm-dd形式、不明な場合はnull）、出金額（半角整数、該当なければ0）、入金額（半角整数、該当なければ0）、残高（半角整数、不明な場合はnull）、取引内容（文字列、摘要など、不明な場合は空文字）を抽出してください。

日付の年は西暦 (yyyy-mm-dd形式) でお願いします。
現在の西暦年は {current_year}年 (令和{current_reiwa_year}年) です。

金額が「***」や「---」のようにマスクされている場合は0としてください。
繰り越し行など、出金額と入金額が両方とも0になるような実質的な取引ではない行は抽出対象外としてください。
{handwriting_instruction}

出力形式:
[
  {{
    "取引日": "yyyy-mm-dd",
    "出金額": 0,
    "入金額": 0,
    "残高": 0,
    "取引内容": ""
  }}
]"#
    )
}

pub const DEPOSIT_PROMPT: &str = r#"この残高証明書の画像から以下の情報を抽出してJSON形式で返してください：
- 金融機関名
- 支店名
- 預金種類（普通預金、定期預金等）
- 口座番号
- 残高
- 既経過利子（定期預金の場合）

出力形式:
{
  "financial_institution": "金融機関名",
  "branch": "支店名",
  "account_type": "預金種類",
  "account_number": "口座番号",
  "balance": 残高金額,
  "accrued_interest": 既経過利子
}"#;

pub const STOCK_PROMPT: &str = r#"この証券会社の報告書・残高証明書から以下の情報を抽出してJSON形式で返してください：
- 銘柄名
- 証券会社名
- 支店名
- 評価額
- 株式数または口数

出力形式:
{
  "stock_name": "銘柄名",
  "securities_company": "証券会社名",
  "branch_name": "支店名",
  "valuation": 評価額,
  "quantity": 株式数または口数
}"#;

pub const INSURANCE_PROMPT: &str = r#"この保険証券・解約返戻金証明書から以下の情報を抽出してJSON形式で返してください：
- 保険会社名
- 証券番号
- 契約者
- 被保険者
- 保険金受取人
- 受取年月日
- 保険金額
- 解約返戻金額

出力形式:
{
  "insurance_company": "保険会社名",
  "policy_number": "証券番号",
  "policyholder": "契約者",
  "insured": "被保険者",
  "beneficiary": "保険金受取人",
  "receipt_date": "受取年月日",
  "insurance_amount": 保険金額,
  "surrender_value": 解約返戻金額
}"#;

pub const LAND_BUILDING_PROMPT: &str = r#"この登記簿謄本・名寄帳・固定資産税通知書から以下の情報を抽出してJSON形式で返してください：
- 所在地（都道府県、市区町村、大字・丁目）
- 地番
- 家屋番号
- 登記地目（登記簿の場合）
- 課税地目（名寄帳等の場合）
- 持分
- 地積
- 敷地権割合（マンションの場合）
- 固定資産税評価額
- 所有者名または名義人名（可能な場合）

出力形式:
{
  "prefecture": "都道府県",
  "city": "市区町村",
  "address": "大字・丁目",
  "lot_number": "地番",
  "house_number": "家屋番号",
  "registered_land_category": "登記地目",
  "taxed_land_category": "課税地目",
  "ownership_ratio": "持分",
  "area": 地積,
  "site_right_ratio": "敷地権割合",
  "fixed_asset_tax_value": 固定資産税評価額,
  "owner_names": ["所有者名1", "所有者名2"]
}"#;

pub const CLASSIFICATION_PROMPT: &str = r#"この画像の書類タイプを判定してください。

以下の書類タイプの中から最も適切なものを選んでください：
1. LAND_BUILDING: 登記簿謄本、名寄帳、固定資産税通知書、評価証明書
2. LISTED_STOCK: 証券会社の報告書、株式・投資信託の残高証明書
3. OTHER_INVESTMENT: 出資証明書、非上場株式の証明書
4. PUBLIC_BOND: 国債・社債の証券、債券証明書
5. DEPOSIT: 銀行・郵便局の預金残高証明書
6. LIFE_INSURANCE: 生命保険証券、解約返戻金証明書
7. DEATH_RETIREMENT: 死亡退職金支払調書
8. OTHER_PROPERTY: 骨董品鑑定書、車検証、その他財産証明書
9. DEBT: 借入金残高証明書、未払金通知、病院の領収書
10. FUNERAL_EXPENSE: 葬儀費用領収書、お布施メモ
11. PASSBOOK: 通帳、取引履歴
12. PROCEDURE_DOC: 戸籍謄本・抄本、法定相続情報一覧図、印鑑証明書、住民票
13. UNKNOWN: 上記のどれにも該当しない書類

判定基準：
- 書類のタイトルやヘッダー情報を重視
- 表形式のデータがある場合、その内容を確認
- 金融機関名、保険会社名、不動産情報などの特定キーワードを確認

出力形式:
{
  "document_type": "書類タイプ名",
  "confidence": 0.0-1.0,
  "detected_keywords": ["検出キーワード1", "検出キーワード2"]
}"#;

/// Fallback used when a category has no registered extraction schema: pull
/// the visible text out as-is so a human can still work with the document.
pub const RAW_TEXT_PROMPT: &str = r#"この書類の画像から読み取れる全ての文字情報を抽出してください。
表や項目の構造はできるだけ保ち、印字された内容を忠実に書き出してください。

出力形式:
{
  "raw_text": "抽出した全文"
}"#;
