use serde::Serialize;

use super::domain::{to_db_timestamp, Lead};

#[derive(Serialize)]
struct LeadCsvRow<'a> {
    email: &'a str,
    name: &'a str,
    income_range: &'a str,
    source: &'a str,
    subscribed: &'static str,
    created_at: String,
}

impl<'a> From<&'a Lead> for LeadCsvRow<'a> {
    fn from(lead: &'a Lead) -> Self {
        Self {
            email: &lead.email,
            name: lead.name.as_deref().unwrap_or_default(),
            income_range: lead.income_range.as_deref().unwrap_or_default(),
            source: &lead.source,
            subscribed: if lead.subscribed { "yes" } else { "no" },
            created_at: to_db_timestamp(lead.created_at),
        }
    }
}

/// Renders leads as CSV with an `email,name,income_range,source,subscribed,created_at` header.
pub fn leads_to_csv(leads: &[Lead]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if leads.is_empty() {
        writer.write_record([
            "email",
            "name",
            "income_range",
            "source",
            "subscribed",
            "created_at",
        ])?;
    }
    for lead in leads {
        writer.serialize(LeadCsvRow::from(lead))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    String::from_utf8(bytes).map_err(|err| {
        csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    })
}
