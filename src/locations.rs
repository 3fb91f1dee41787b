use crate::error::{FinderError, Result};
use crate::fetcher::PageFetcher;
use crate::models::LocationRef;
use serde::Deserialize;
use tracing::{debug, warn};

const AUTOCOMPLETE_URL: &str = "https://www.hemnet.se/locations/show";

// Known municipality ids, keyed by every accepted spelling (stored lowercase;
// hyphen and ASCII variants map to the same id). Hits here skip the network.
const MUNICIPALITIES: &[(&str, &str, &str)] = &[
    ("stockholm", "Stockholm", "17744"),
    ("göteborg", "Göteborg", "17920"),
    ("goteborg", "Göteborg", "17920"),
    ("malmö", "Malmö", "17989"),
    ("malmo", "Malmö", "17989"),
    ("uppsala", "Uppsala", "17755"),
    ("västerås", "Västerås", "18070"),
    ("vasteras", "Västerås", "18070"),
    ("örebro", "Örebro", "18024"),
    ("orebro", "Örebro", "18024"),
    ("linköping", "Linköping", "17847"),
    ("linkoping", "Linköping", "17847"),
    ("helsingborg", "Helsingborg", "17758"),
    ("jönköping", "Jönköping", "17790"),
    ("jonkoping", "Jönköping", "17790"),
    ("norrköping", "Norrköping", "17848"),
    ("norrkoping", "Norrköping", "17848"),
    ("lund", "Lund", "17870"),
    ("umeå", "Umeå", "18110"),
    ("umea", "Umeå", "18110"),
    ("gävle", "Gävle", "17757"),
    ("gavle", "Gävle", "17757"),
    ("borås", "Borås", "17899"),
    ("boras", "Borås", "17899"),
    ("södertälje", "Södertälje", "17906"),
    ("sodertalje", "Södertälje", "17906"),
    ("eskilstuna", "Eskilstuna", "17753"),
    ("halmstad", "Halmstad", "17782"),
    ("växjö", "Växjö", "18126"),
    ("vaxjo", "Växjö", "18126"),
    ("karlstad", "Karlstad", "17801"),
    ("sundsvall", "Sundsvall", "18057"),
    ("östersund", "Östersund", "18142"),
    ("ostersund", "Östersund", "18142"),
    ("trollhättan", "Trollhättan", "18079"),
    ("trollhattan", "Trollhättan", "18079"),
    ("luleå", "Luleå", "17868"),
    ("lulea", "Luleå", "17868"),
    ("borlänge", "Borlänge", "17738"),
    ("borlange", "Borlänge", "17738"),
    ("upplands väsby", "Upplands Väsby", "18115"),
    ("upplands-väsby", "Upplands Väsby", "18115"),
    ("upplands vasby", "Upplands Väsby", "18115"),
    ("upplands-vasby", "Upplands Väsby", "18115"),
    ("falun", "Falun", "17754"),
    ("kalmar", "Kalmar", "17795"),
    ("kristianstad", "Kristianstad", "17809"),
    ("skellefteå", "Skellefteå", "17926"),
    ("skelleftea", "Skellefteå", "17926"),
    ("karlskrona", "Karlskrona", "17800"),
    ("nacka", "Nacka", "17836"),
    ("solna", "Solna", "17941"),
    ("täby", "Täby", "18084"),
    ("taby", "Täby", "18084"),
];

#[derive(Debug, Deserialize)]
struct AutocompleteHit {
    id: serde_json::Value,
    name: String,
    #[serde(default)]
    location_type: String,
}

/// Maps a free-text place name to the site's internal location id.
/// Static table first, remote autocomplete on a miss. The autocomplete
/// endpoint goes through the shared fetcher so a directly blocked request
/// still gets its rendered-page fallback.
pub struct LocationResolver {
    fetcher: PageFetcher,
}

impl LocationResolver {
    pub fn new(fetcher: PageFetcher) -> Self {
        LocationResolver { fetcher }
    }

    pub fn resolve(&self, name: &str) -> Result<LocationRef> {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(FinderError::NotFound("empty location name".to_string()));
        }

        if let Some(hit) = lookup_static(&normalized) {
            debug!(location = %name, id = %hit.id, "static location table hit");
            return Ok(hit);
        }

        debug!(location = %name, "static table miss, querying autocomplete");
        self.autocomplete(AUTOCOMPLETE_URL, name)
    }

    fn autocomplete(&self, endpoint: &str, name: &str) -> Result<LocationRef> {
        let url = format!("{}?q={}&limit=5", endpoint, urlencoding::encode(name.trim()));

        let value = match self.fetcher.fetch_json(&url) {
            Ok(v) => v,
            Err(e) => {
                warn!(location = %name, error = %e, "autocomplete lookup failed");
                return Err(FinderError::NotFound(format!(
                    "could not resolve location '{}'",
                    name
                )));
            }
        };

        let hits: Vec<AutocompleteHit> = match serde_json::from_value(value) {
            Ok(h) => h,
            Err(e) => {
                warn!(location = %name, error = %e, "autocomplete response had an unexpected shape");
                return Err(FinderError::NotFound(format!(
                    "could not resolve location '{}'",
                    name
                )));
            }
        };

        // First hit wins; the remote type vocabulary is passed through
        // untouched.
        match hits.into_iter().next() {
            Some(hit) => Ok(LocationRef {
                id: json_id_to_string(&hit.id),
                name: hit.name,
                kind: hit.location_type,
            }),
            None => Err(FinderError::NotFound(format!(
                "no location matches '{}'",
                name
            ))),
        }
    }
}

fn lookup_static(normalized: &str) -> Option<LocationRef> {
    MUNICIPALITIES
        .iter()
        .find(|(key, _, _)| *key == normalized)
        .map(|(_, display, id)| LocationRef {
            id: (*id).to_string(),
            name: (*display).to_string(),
            kind: "municipality".to_string(),
        })
}

fn json_id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::RendererConfig;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn serve_once(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 8192];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn autocomplete_goes_through_the_shared_fetcher() {
        let endpoint = serve_once(
            r#"[{"id":473456,"name":"Södermalm, Stockholms kommun","location_type":"district"}]"#,
        );
        let fetcher = PageFetcher::new(RendererConfig::default()).unwrap();
        let resolver = LocationResolver::new(fetcher);
        let hit = resolver.autocomplete(&endpoint, "Södermalm").unwrap();
        assert_eq!(hit.id, "473456");
        assert_eq!(hit.name, "Södermalm, Stockholms kommun");
        assert_eq!(hit.kind, "district");
    }

    #[test]
    fn autocomplete_failure_maps_to_not_found() {
        // No renderer configured and nothing listening on the endpoint.
        let fetcher = PageFetcher::new(RendererConfig::default()).unwrap();
        let resolver = LocationResolver::new(fetcher);
        match resolver.autocomplete("http://127.0.0.1:1", "Atlantis") {
            Err(FinderError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn static_table_resolves_without_network() {
        let hit = lookup_static("stockholm").unwrap();
        assert_eq!(hit.id, "17744");
        assert_eq!(hit.name, "Stockholm");
        assert_eq!(hit.kind, "municipality");
    }

    #[test]
    fn static_table_is_case_and_whitespace_insensitive_via_resolve_normalization() {
        let normalized = "  Göteborg ".trim().to_lowercase();
        let hit = lookup_static(&normalized).unwrap();
        assert_eq!(hit.id, "17920");
    }

    #[test]
    fn spelling_variants_share_one_id() {
        let a = lookup_static("upplands väsby").unwrap();
        let b = lookup_static("upplands-vasby").unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.name, "Upplands Väsby");
    }

    #[test]
    fn unknown_name_misses_static_table() {
        assert!(lookup_static("atlantis").is_none());
    }

    #[test]
    fn numeric_autocomplete_id_becomes_string() {
        assert_eq!(json_id_to_string(&serde_json::json!(473456)), "473456");
        assert_eq!(json_id_to_string(&serde_json::json!("473456")), "473456");
    }
}
