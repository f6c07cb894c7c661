use crate::functions::{KeyValue, Mapper, Reducer};

/// Emite `(token_en_minúscula, "1")` por cada palabra separada por espacios.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountMapper;

impl Mapper for WordCountMapper {
    fn map(&self, _key: &str, value: &str) -> anyhow::Result<Vec<KeyValue>> {
        Ok(value
            .split_whitespace()
            .map(|word| (word.to_lowercase(), "1".to_string()))
            .collect())
    }
}

/// El valor reducido es la cantidad de valores de la clave.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountReducer;

impl Reducer for CountReducer {
    fn reduce(&self, _key: &str, values: &[String]) -> anyhow::Result<String> {
        Ok(values.len().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shuffle::group_by_key;

    #[test]
    fn mapper_lowercases_and_emits_one_per_token() {
        let out = WordCountMapper.map("0", "Hola  hola\tMUNDO").unwrap();
        assert_eq!(
            out,
            vec![
                ("hola".to_string(), "1".to_string()),
                ("hola".to_string(), "1".to_string()),
                ("mundo".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn mapper_on_blank_line_emits_nothing() {
        assert!(WordCountMapper.map("3", "   ").unwrap().is_empty());
    }

    #[test]
    fn word_count_over_two_lines() {
        let mut pairs = Vec::new();
        for (n, line) in ["a b a", "b c"].iter().enumerate() {
            pairs.extend(WordCountMapper.map(&n.to_string(), line).unwrap());
        }

        let counts: Vec<(String, String)> = group_by_key(pairs)
            .into_iter()
            .map(|(k, vs)| {
                let v = CountReducer.reduce(&k, &vs).unwrap();
                (k, v)
            })
            .collect();

        assert_eq!(
            counts,
            vec![
                ("a".to_string(), "2".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "1".to_string()),
            ]
        );
    }
}
