//! HTML rendering of enriched events.
//!
//! Messages use Telegram's HTML parse mode. Every piece of dynamic text is
//! escaped; unknown fields render as [`PLACEHOLDER`].

use rust_decimal::Decimal;

use crate::domain::{EnrichedEvent, EventKind, Lookup, Pnl, RenderedMessage};

/// Rendered in place of a field whose lookup failed.
pub const PLACEHOLDER: &str = "—";

/// Default block explorer for transaction links.
pub const DEFAULT_EXPLORER_URL: &str = "https://bscscan.com";

/// Renders [`EnrichedEvent`]s into notification text.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    explorer_url: String,
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_EXPLORER_URL)
    }
}

impl MessageFormatter {
    pub fn new(explorer_url: impl Into<String>) -> Self {
        Self {
            explorer_url: explorer_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Render `event` as an HTML message.
    #[must_use]
    pub fn render(&self, event: &EnrichedEvent) -> RenderedMessage {
        let raw = &event.raw;
        let side = raw.kind.side().label();
        let is_liquidation = matches!(raw.kind, EventKind::Liquidation(_));

        let mut lines = vec![
            match &raw.kind {
                EventKind::Increase(_) => format!("📈 <b>Increase {side}</b>"),
                EventKind::Decrease(_) => format!("📉 <b>Decrease {side}</b>"),
                EventKind::Liquidation(_) => "💀 <b>Liquidation</b>".to_string(),
            },
            format!("• Trader: <code>{}</code>", raw.account),
            format!("• Pair: {}", escape_html(&event.symbol)),
        ];
        if is_liquidation {
            lines.push(format!("• Side: {side}"));
        }
        lines.push(format!("• Size: {}", usd(event.size_usd)));
        lines.push(format!("• Collateral: {}", usd(event.collateral_usd)));
        lines.push(format!("• Leverage: {}", ratio(event.leverage)));
        if !is_liquidation {
            lines.push(format!("• Entry Price: {}", price(event.entry_price)));
        }
        lines.push(format!("• Mark Price: {}", price(event.mark_price)));
        lines.push(format!("• PnL: {}", pnl(event.pnl)));
        lines.push(match &raw.tx_hash {
            Some(hash) => format!(
                "🔗 <a href=\"{}/tx/{}\">tx</a>",
                escape_html(&self.explorer_url),
                escape_html(hash)
            ),
            None => format!("🔗 <code>{}</code>", escape_html(raw.id.as_str())),
        });

        RenderedMessage::new(raw.id.clone(), raw.timestamp, lines.join("\n"))
    }
}

fn usd(value: Lookup<Decimal>) -> String {
    match value {
        Lookup::Known(v) => format!("${:.2}", v.round_dp(2)),
        Lookup::Unknown => PLACEHOLDER.to_string(),
    }
}

fn price(value: Lookup<Decimal>) -> String {
    match value {
        Lookup::Known(v) => format!("${}", v.round_dp(4).normalize()),
        Lookup::Unknown => PLACEHOLDER.to_string(),
    }
}

fn ratio(value: Lookup<Decimal>) -> String {
    match value {
        Lookup::Known(v) => format!("{:.1}x", v.round_dp(1)),
        Lookup::Unknown => PLACEHOLDER.to_string(),
    }
}

fn pnl(value: Lookup<Pnl>) -> String {
    match value {
        Lookup::Known(p) if p.is_profit() => format!("🟢 +${:.2}", p.magnitude().round_dp(2)),
        Lookup::Known(p) => format!("🔴 -${:.2}", p.magnitude().round_dp(2)),
        Lookup::Unknown => PLACEHOLDER.to_string(),
    }
}

/// Escape text for Telegram HTML.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}
