//! The symbol grammar and payoff function (§3 "Symbol grammar", §4.1
//! `settle_game`).

/// Room-wide settlement basis, fixed at `start_game` (§3 `settlement_value`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementValue {
    pub a: i64,
    pub b: i64,
}

/// European option flavor (§3, §6 `NewInstrument.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    fn as_symbol_suffix(self) -> &'static str {
        match self {
            OptionKind::Call => "CALL",
            OptionKind::Put => "PUT",
        }
    }
}

/// Builds the instrument symbol for an option on `underlying` (§3
/// `<underlying>-<strike>-CALL|PUT`).
pub fn option_symbol(underlying: &str, strike: i64, kind: OptionKind) -> String {
    format!("{underlying}-{strike}-{}", kind.as_symbol_suffix())
}

/// Builds the spread instrument's symbol: whichever of `A-B`/`B-A` is
/// non-negative (§3, §4.1 `init_underlying`).
pub fn spread_symbol(settlement: &SettlementValue) -> String {
    if settlement.a >= settlement.b {
        "A-B".to_string()
    } else {
        "B-A".to_string()
    }
}

/// The settlement-time value of `symbol` given the room's settlement basis
/// (§3 "Symbol grammar"). Instruments outside the grammar settle to 0 —
/// unreachable in practice since every instrument is created through
/// `Room::init_underlying`/`Room::new_option`, both of which only ever
/// produce grammar-conformant symbols.
pub fn payoff(symbol: &str, settlement: &SettlementValue) -> i64 {
    match symbol {
        "A" => settlement.a,
        "B" => settlement.b,
        "CASH" => 1,
        "A-B" => settlement.a - settlement.b,
        "B-A" => settlement.b - settlement.a,
        _ => option_payoff(symbol, settlement).unwrap_or(0),
    }
}

fn option_payoff(symbol: &str, settlement: &SettlementValue) -> Option<i64> {
    let (rest, kind) = symbol.rsplit_once('-')?;
    let (underlying, strike_str) = rest.rsplit_once('-')?;
    let strike: i64 = strike_str.parse().ok()?;
    let underlying_value = underlying_value(underlying, settlement)?;
    match kind {
        "CALL" => Some((underlying_value - strike).max(0)),
        "PUT" => Some((strike - underlying_value).max(0)),
        _ => None,
    }
}

fn underlying_value(symbol: &str, settlement: &SettlementValue) -> Option<i64> {
    match symbol {
        "A" => Some(settlement.a),
        "B" => Some(settlement.b),
        "A-B" => Some(settlement.a - settlement.b),
        "B-A" => Some(settlement.b - settlement.a),
        _ => None,
    }
}
