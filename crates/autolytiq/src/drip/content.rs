use serde::Serialize;

use super::schedule::{DelaySchedule, STANDARD_DELAY_DAYS};

const NAME_FALLBACK: &str = "there";

/// One email in the drip sequence. Bodies use `{name}` and `{site}` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DripEmail {
    pub step: u8,
    pub subject: &'static str,
    pub body: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedEmail {
    pub step: u8,
    pub subject: String,
    pub html: String,
    pub unsubscribe_url: String,
}

/// The eight-part financial education series sent after signup.
#[derive(Debug, Clone)]
pub struct DripSequence {
    emails: Vec<DripEmail>,
    schedule: DelaySchedule,
}

impl DripSequence {
    pub fn standard() -> Self {
        Self {
            emails: STANDARD_EMAILS.to_vec(),
            schedule: DelaySchedule::standard(),
        }
    }

    pub fn schedule(&self) -> &DelaySchedule {
        &self.schedule
    }

    pub fn emails(&self) -> &[DripEmail] {
        &self.emails
    }

    pub fn email(&self, step: u8) -> Option<&DripEmail> {
        self.emails.iter().find(|email| email.step == step)
    }

    /// Fills in the recipient name and site links and wraps the body in the
    /// branded layout.
    pub fn render(
        &self,
        step: u8,
        name: Option<&str>,
        public_url: &str,
        unsubscribe_token: &str,
    ) -> Option<RenderedEmail> {
        let email = self.email(step)?;
        let site = public_url.trim_end_matches('/');
        let name = name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(NAME_FALLBACK);
        let body = email
            .body
            .replace("{site}", site)
            .replace("{name}", &escape_html(name));
        let unsubscribe_url = unsubscribe_url(site, unsubscribe_token);

        Some(RenderedEmail {
            step,
            subject: email.subject.to_string(),
            html: wrap_in_layout(&body, site, &unsubscribe_url),
            unsubscribe_url,
        })
    }
}

impl Default for DripSequence {
    fn default() -> Self {
        Self::standard()
    }
}

pub fn unsubscribe_url(public_url: &str, token: &str) -> String {
    format!(
        "{}/api/v1/leads/unsubscribe/{token}",
        public_url.trim_end_matches('/')
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn wrap_in_layout(body: &str, site: &str, unsubscribe_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><meta name="viewport" content="width=device-width,initial-scale=1.0"></head>
<body style="margin:0;padding:0;background:#f4f4f5;font-family:-apple-system,'Segoe UI',Roboto,sans-serif">
<table width="100%" cellpadding="0" cellspacing="0" style="background:#f4f4f5;padding:32px 16px">
<tr><td align="center">
<table width="600" cellpadding="0" cellspacing="0" style="background:#fff;border-radius:12px;max-width:100%">
<tr><td style="background:#6366f1;padding:24px 32px">
<a href="{site}" style="color:#fff;text-decoration:none;font-size:20px;font-weight:700">Autolytiq</a>
</td></tr>
<tr><td style="padding:32px;color:#374151;font-size:15px;line-height:1.6">
{body}
</td></tr>
<tr><td style="padding:24px 32px;background:#f9fafb;text-align:center;font-size:12px;color:#9ca3af">
<p>Autolytiq - Free Financial Calculators</p>
<p><a href="{unsubscribe_url}" style="color:#9ca3af">Unsubscribe</a></p>
</td></tr>
</table>
</td></tr>
</table>
</body>
</html>"#
    )
}

const STANDARD_EMAILS: [DripEmail; STANDARD_DELAY_DAYS.len()] = [
    DripEmail {
        step: 1,
        subject: "Welcome to Autolytiq - Your Financial Clarity Starts Here",
        body: r#"<h2>Welcome to Autolytiq, {name}!</h2>
<p>You now have free access to every calculator on the site: income projection, budgeting, taxes, housing and auto affordability.</p>
<p><a href="{site}/calculator">Start calculating</a></p>
<p>Over the next eight weeks we will send one short, practical money lesson at a time.</p>"#,
    },
    DripEmail {
        step: 2,
        subject: "The #1 Rule for Financial Clarity: Know Your Real Numbers",
        body: r#"<h2>Do you know your real annual income, {name}?</h2>
<p>Biweekly pay, variable hours, or a mid-year start can make your actual annual income very different from your salary.</p>
<p>Lenders, budgets, and tax brackets all depend on that number. Run your latest paystub through the <a href="{site}/calculator">income calculator</a> to see it.</p>"#,
    },
    DripEmail {
        step: 3,
        subject: "The 50/30/20 Budget Rule (And When to Break It)",
        body: r#"<h2>The simplest budget that works</h2>
<p>Put 50% of take-home pay toward needs, 30% toward wants and 20% toward savings.</p>
<p>Living somewhere expensive? A 60/20/20 split is a reasonable starting point. Try both in the <a href="{site}/smart-money">budget planner</a>.</p>"#,
    },
    DripEmail {
        step: 4,
        subject: "How Much House Can You Actually Afford?",
        body: r#"<h2>Look past the principal and interest</h2>
<p>Property tax, insurance and PMI can add hundreds to a monthly payment. Keep the full amount under 28% of gross income.</p>
<p>See your complete monthly cost with the <a href="{site}/mortgage">mortgage calculator</a>.</p>"#,
    },
    DripEmail {
        step: 5,
        subject: "Your Taxes Are Probably Higher Than You Think",
        body: r#"<h2>Federal tax is only part of the bill</h2>
<p>State tax and FICA take their share before you see a paycheck, and 401(k) and health premiums change what is left.</p>
<p>The <a href="{site}/taxes">tax estimator</a> breaks it all down, {name}.</p>"#,
    },
    DripEmail {
        step: 6,
        subject: "The Car Affordability Rule No One Talks About",
        body: r#"<h2>Keep car payments under 12% of gross monthly income</h2>
<p>Longer loans lower the payment but raise the total interest. Compare terms before you visit a dealer.</p>
<p>Check a price with the <a href="{site}/auto">auto loan calculator</a>.</p>"#,
    },
    DripEmail {
        step: 7,
        subject: "The Power of Multiple Income Streams",
        body: r#"<h2>One paycheck is a single point of failure</h2>
<p>Freelance work, gig driving, rentals and dividends all add up. Tracking them together shows what you really earn.</p>
<p>Total them in the <a href="{site}/income-streams">income streams tracker</a>.</p>"#,
    },
    DripEmail {
        step: 8,
        subject: "Your 5-Year Financial Roadmap",
        body: r#"<h2>Where do you want to be in five years, {name}?</h2>
<p>Build an emergency fund first, then pay down high-interest debt, then invest consistently. Small monthly contributions compound.</p>
<p>Project your growth with the <a href="{site}/compound">compound growth calculator</a>. Thanks for reading the series.</p>"#,
    },
];
