use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

pub const DEFAULT_PCT: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseType {
    #[serde(rename = "Transports")]
    Transports,
    #[serde(rename = "Restaurants et bars")]
    RestaurantsEtBars,
    #[serde(rename = "Hôtel et logement")]
    HotelEtLogement,
    #[serde(rename = "Services en ligne")]
    ServicesEnLigne,
    #[serde(rename = "IT et électronique")]
    ItEtElectronique,
    #[serde(rename = "Equipement et matériel")]
    EquipementEtMateriel,
    #[serde(rename = "Fournitures de bureau")]
    FournituresDeBureau,
}

impl ExpenseType {
    pub const ALL: [ExpenseType; 7] = [
        ExpenseType::Transports,
        ExpenseType::RestaurantsEtBars,
        ExpenseType::HotelEtLogement,
        ExpenseType::ServicesEnLigne,
        ExpenseType::ItEtElectronique,
        ExpenseType::EquipementEtMateriel,
        ExpenseType::FournituresDeBureau,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExpenseType::Transports => "Transports",
            ExpenseType::RestaurantsEtBars => "Restaurants et bars",
            ExpenseType::HotelEtLogement => "Hôtel et logement",
            ExpenseType::ServicesEnLigne => "Services en ligne",
            ExpenseType::ItEtElectronique => "IT et électronique",
            ExpenseType::EquipementEtMateriel => "Equipement et matériel",
            ExpenseType::FournituresDeBureau => "Fournitures de bureau",
        }
    }
}

impl std::fmt::Display for ExpenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExpenseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ExpenseType::ALL
            .iter()
            .copied()
            .find(|t| t.label().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown expense type: {}", s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    #[default]
    Pending,
    Accepted,
    Refused,
}

impl BillStatus {
    pub fn label(self) -> &'static str {
        match self {
            BillStatus::Pending => "En attente",
            BillStatus::Accepted => "Accepté",
            BillStatus::Refused => "Refusé",
        }
    }
}

/// An expense bill as stored by the backend. `id` is `None` until the
/// backend has created the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub email: String,
    #[serde(rename = "type")]
    pub expense_type: ExpenseType,
    #[serde(default)]
    pub name: String,
    pub amount: f64,
    /// Missing or null dates decode as `""` and sort after dated bills.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub date: String,
    #[serde(default)]
    pub vat: String,
    #[serde(default = "default_pct")]
    pub pct: u8,
    #[serde(default)]
    pub commentary: String,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub status: BillStatus,
}

fn default_pct() -> u8 {
    DEFAULT_PCT
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl BillRecord {
    /// Assembles the record sent to the backend from the user's draft, the
    /// session identity and the uploaded receipt, if any.
    pub fn from_draft(draft: &BillDraft, session: &Session, receipt: Option<&UploadedFile>) -> Self {
        let (file_url, file_name) = match receipt {
            Some(uploaded) => (uploaded.file_url.clone(), uploaded.file_name.clone()),
            None => (String::new(), String::new()),
        };
        BillRecord {
            id: None,
            email: session.email.clone(),
            expense_type: draft.expense_type,
            name: draft.name.clone(),
            amount: draft.amount,
            date: draft.date.clone(),
            vat: draft.vat.clone(),
            pct: draft.pct.unwrap_or(DEFAULT_PCT),
            commentary: draft.commentary.clone(),
            file_url,
            file_name,
            status: BillStatus::Pending,
        }
    }

    /// Receipt URL and file name, only when both are present.
    pub fn receipt(&self) -> Option<(&str, &str)> {
        if self.file_url.is_empty() || self.file_name.is_empty() {
            None
        } else {
            Some((self.file_url.as_str(), self.file_name.as_str()))
        }
    }
}

/// Fields the employee fills in on the new bill form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillDraft {
    pub expense_type: ExpenseType,
    pub name: String,
    pub amount: f64,
    pub date: String,
    pub vat: String,
    pub pct: Option<u8>,
    pub commentary: String,
}

impl BillDraft {
    pub fn new(expense_type: ExpenseType, date: impl Into<String>, amount: f64) -> Self {
        BillDraft {
            expense_type,
            name: String::new(),
            amount,
            date: date.into(),
            vat: String::new(),
            pct: None,
            commentary: String::new(),
        }
    }
}

/// A local file picked as receipt, not yet uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl AttachedFile {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        AttachedFile {
            file_name: file_name.into(),
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_url: String,
    pub file_name: String,
}

/// Identity of the signed-in employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
}

impl Session {
    pub fn new(email: impl Into<String>) -> Self {
        Session { email: email.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub email: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionLog {
    pub id: String,
    pub bill_id: Option<String>,
    pub stage: String,
    pub status: String,
    pub message: Option<String>,
    pub created_at: String,
}
