//! Transaction-type classification.
//!
//! Each bank maps its free-text operation tokens onto a closed, shared
//! vocabulary of transaction-type labels. The resolution mechanism is the
//! same for every bank: exact key match first, then the longest registered
//! key contained in the token, then a bank-specific default.

/// Shared transaction-type label vocabulary.
pub mod labels {
    pub const ALTRO: &str = "Altro";
    pub const ADDEBITO_DIRETTO: &str = "Addebito diretto";
    pub const ASSEGNO: &str = "Assegno";
    pub const BANCOMAT_PAY: &str = "BANCOMAT Pay";
    pub const BONIFICO_EFFETTUATO: &str = "Bonifico effettuato";
    pub const BONIFICO_RICEVUTO: &str = "Bonifico ricevuto";
    pub const CANONE_CC: &str = "Canone CC";
    pub const CANONE_INVESTIMENTO: &str = "Canone investimento";
    pub const CARTA_DI_CREDITO: &str = "Carta di credito";
    pub const CARTA_PREPAGATA: &str = "Carta prepagata";
    pub const COMMISSIONE_SU_BONIFICO: &str = "Commissione su bonifico/addebito diretto";
    pub const GIROCONTO: &str = "Giroconto";
    pub const IMPORTO_INIZIALE_SU_CONTO: &str = "Importo iniziale su conto";
    pub const IMPOSTA_DI_BOLLO: &str = "Imposta di bollo";
    pub const TASSE_INVESTIMENTI: &str = "Tasse investimenti";
    pub const INVESTIMENTO: &str = "Investimento";
    pub const PAGAMENTO_CON_CARTA: &str = "Pagamento con carta";
    pub const PAGAMENTO_F24: &str = "Pagamento F24";
    pub const PAGAMENTO_MAV: &str = "Pagamento Mav";
    pub const PRELIEVO_CONTANTI: &str = "Prelievo contanti";
    pub const PREMIO_POLIZZA_ASSICURATIVA: &str = "Premio polizza assicurativa";
    pub const RICARICA_CARTA_PREPAGATA: &str = "Ricarica Carta Prepagata";
    pub const STIPENDIO: &str = "Stipendio";
}

use labels::*;

/// Intesa: keys match against the lowercased `operazione` field.
pub static INTESA_TYPE_MAP: &[(&str, &str)] = &[
    ("pagamento adue", ADDEBITO_DIRETTO),
    ("addebito diretto", ADDEBITO_DIRETTO),
    ("assegni", ASSEGNO),
    ("assegni circolari emessi", ASSEGNO),
    ("bancomat pay", BANCOMAT_PAY),
    ("fast pay", BANCOMAT_PAY),
    ("beu tramite internet banking", BONIFICO_EFFETTUATO),
    ("bonifico disposto a favore di", BONIFICO_EFFETTUATO),
    ("bonifico istantaneo da voi disposto a favore di", BONIFICO_EFFETTUATO),
    ("disposizione di bonifico", BONIFICO_EFFETTUATO),
    ("accredito beu con contabile", BONIFICO_RICEVUTO),
    ("accredito bonifico istantaneo", BONIFICO_RICEVUTO),
    ("bonifico disposto da", BONIFICO_RICEVUTO),
    ("bonifico istantaneo disposto da", BONIFICO_RICEVUTO),
    ("canone", CANONE_INVESTIMENTO),
    ("ritenute su titoli esteri", TASSE_INVESTIMENTI),
    ("commiss", COMMISSIONE_SU_BONIFICO),
    ("costo bonifico istantaneo", COMMISSIONE_SU_BONIFICO),
    ("maggiorazione bonifico istantaneo", COMMISSIONE_SU_BONIFICO),
    ("giroconto", GIROCONTO),
    ("saldo contabile iniziale", IMPORTO_INIZIALE_SU_CONTO),
    ("imposta di bollo", IMPOSTA_DI_BOLLO),
    ("investimento", INVESTIMENTO),
    ("pagamento premio assicurativo", INVESTIMENTO),
    ("carta n.", PAGAMENTO_CON_CARTA),
    ("deleghe fisco", PAGAMENTO_F24),
    ("pagamento", PAGAMENTO_F24),
    ("pagamento delega f24", PAGAMENTO_F24),
    ("pagamento mav", PAGAMENTO_MAV),
    ("premio polizza", PREMIO_POLIZZA_ASSICURATIVA),
    ("ricarica carta prepagata", RICARICA_CARTA_PREPAGATA),
    ("stipendio", STIPENDIO),
];

/// Allianz: keys match against the text before the first dash of the
/// statement description.
pub static ALLIANZ_TYPE_MAP: &[(&str, &str)] = &[
    ("addeb. diretto", ADDEBITO_DIRETTO),
    ("pagam. diversi", ADDEBITO_DIRETTO),
    ("ass. circolare", ASSEGNO),
    ("disposizione", BONIFICO_EFFETTUATO),
    ("bonif. v/fav.", BONIFICO_RICEVUTO),
    ("st. add. generi", BONIFICO_RICEVUTO),
    ("addebito canone", CANONE_CC),
    ("addebito nexi", CARTA_DI_CREDITO),
    ("cartasi", CARTA_DI_CREDITO),
    ("imposta bollo", IMPOSTA_DI_BOLLO),
    ("imposte/tasse", TASSE_INVESTIMENTI),
    ("pagam. pos", PAGAMENTO_CON_CARTA),
    ("delega unica", PAGAMENTO_F24),
    ("bancomat", PRELIEVO_CONTANTI),
    ("emolumenti", STIPENDIO),
];

/// FinecoBank: keys match against the raw operation label.
pub static FINECO_TYPE_MAP: &[(&str, &str)] = &[
    ("pagamento visa debit", PAGAMENTO_CON_CARTA),
    ("bancomat", PAGAMENTO_CON_CARTA),
    ("visa debit", PAGAMENTO_CON_CARTA),
    ("pagamento bancomat", PAGAMENTO_CON_CARTA),
    ("giroconto", GIROCONTO),
    ("sepa direct debit", ADDEBITO_DIRETTO),
    ("stipendio", STIPENDIO),
    ("bonifico ricevuto", BONIFICO_RICEVUTO),
    ("bonifico effettuato", BONIFICO_EFFETTUATO),
];

/// Map a bank-specific token onto the shared label vocabulary.
///
/// The token is lowercased and trimmed, then tried for an exact key match;
/// failing that, the longest table key contained in the token wins; failing
/// that, `default` is returned.
pub fn resolve_type(token: &str, table: &[(&str, &str)], default: &str) -> String {
    let token = token.trim().to_lowercase();

    if let Some((_, label)) = table.iter().find(|(key, _)| *key == token) {
        return (*label).to_string();
    }

    // Longest key first so the most specific pattern wins.
    let mut keys: Vec<&(&str, &str)> = table.iter().collect();
    keys.sort_by_key(|(key, _)| std::cmp::Reverse(key.len()));
    for (key, label) in keys {
        if token.contains(key) {
            return (*label).to_string();
        }
    }

    default.to_string()
}
