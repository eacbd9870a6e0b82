use serde::{Deserialize, Serialize};

/// One dictionary entry as stored in the record blob.
///
/// On disk the record is a positional JSON array
/// `[phonetic, definition, translation, tag, exchange]`; each slot is a string
/// or `null`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryRecord {
    pub phonetic: Option<String>,
    pub definition: Option<String>,
    pub translation: Option<String>,
    pub tag: Option<String>,
    pub exchange: Option<String>,
}

impl DictionaryRecord {
    /// Parse the positional payload. Arrays of any other length are rejected.
    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        let [phonetic, definition, translation, tag, exchange]: [Option<String>; 5] =
            serde_json::from_slice(bytes)?;
        Ok(Self {
            phonetic,
            definition,
            translation,
            tag,
            exchange,
        })
    }

    pub fn to_json_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&[
            &self.phonetic,
            &self.definition,
            &self.translation,
            &self.tag,
            &self.exchange,
        ])
    }

    /// `kind:form` pairs from the exchange field, e.g. `p:went/d:gone`.
    pub fn exchange_forms(&self) -> Vec<(&str, &str)> {
        let Some(exchange) = self.exchange.as_deref() else {
            return Vec::new();
        };
        exchange
            .split('/')
            .filter_map(|pair| pair.split_once(':'))
            .map(|(kind, form)| (kind.trim(), form.trim()))
            .filter(|(kind, form)| !kind.is_empty() && !form.is_empty())
            .collect()
    }

    /// Lemma this entry is an inflection of (`0:` in the exchange field).
    pub fn base_form(&self) -> Option<&str> {
        self.exchange_forms()
            .into_iter()
            .find_map(|(kind, form)| (kind == "0").then_some(form))
    }

    /// Translation senses, one per line. Both real and escaped newlines split.
    pub fn translations(&self) -> Vec<&str> {
        let Some(translation) = self.translation.as_deref() else {
            return Vec::new();
        };
        translation
            .split('\n')
            .flat_map(|line| line.split("\\n"))
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Exam/frequency tags such as `zk gk cet4`.
    pub fn tags(&self) -> Vec<&str> {
        self.tag
            .as_deref()
            .map(|tag| tag.split_whitespace().collect())
            .unwrap_or_default()
    }
}
