//! Score and analysis loading for one viewer instance.

use std::path::Path;

use lectern_core::options::ViewerOptions;
use lectern_core::partition::partition;
use lectern_core::pitch::resolve_steps;
use lectern_core::score::RenderedScore;
use lectern_types::{AnalysisDoc, Step};

/// Everything derived from the loaded score document. Partitioning and
/// pitch resolution run here, after the rendered document is confirmed
/// loaded, and never again for the session.
pub struct ViewerSession {
    pub score: RenderedScore,
    pub steps: Vec<Step>,
    pub analysis: Option<AnalysisDoc>,
}

impl ViewerSession {
    /// Load the score and analysis for the configured viewer. A score
    /// failure is terminal for this viewer instance; a missing or broken
    /// analysis document only suppresses annotations.
    pub fn load(options: &ViewerOptions) -> Result<Self, String> {
        let score = RenderedScore::load(&options.score)?;

        let mut steps = partition(&score.root);
        resolve_steps(&mut steps, &score);
        log::info!(
            "loaded {}: {} steps",
            options.score.display(),
            steps.len()
        );

        let analysis = load_analysis(&options.analysis_path());

        Ok(Self {
            score,
            steps,
            analysis,
        })
    }
}

fn load_analysis(path: &Path) -> Option<AnalysisDoc> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(_) => {
            log::info!("no analysis document at {}", path.display());
            return None;
        }
    };
    match AnalysisDoc::from_json(&text) {
        Some(doc) => Some(doc),
        None => {
            log::warn!("ignoring malformed analysis document {}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCORE_JSON: &str = r#"{
        "page": {"width": 400.0, "height": 200.0},
        "root": {
            "id": "m1", "kind": "measure",
            "children": [
                {"id": "c1", "kind": "chord", "children": [
                    {"id": "n1", "kind": "note", "children": [{"id": "n1h", "kind": "notehead"}]},
                    {"id": "n2", "kind": "note", "children": [{"id": "n2h", "kind": "notehead"}]}
                ]},
                {"id": "n3", "kind": "note", "children": [{"id": "n3h", "kind": "notehead"}]}
            ]
        },
        "notes": {
            "n1": {"pname": "C", "octave": 4},
            "n2": {"pname": "E", "octave": 4},
            "n3": {"pname": "G", "octave": 4}
        },
        "bounds": {}
    }"#;

    #[test]
    fn test_load_partitions_and_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let score_path = dir.path().join("piece.json");
        std::fs::File::create(&score_path)
            .unwrap()
            .write_all(SCORE_JSON.as_bytes())
            .unwrap();

        let options =
            ViewerOptions::from_query(&format!("score={}", score_path.display())).unwrap();
        let session = ViewerSession::load(&options).unwrap();

        assert_eq!(session.steps.len(), 2);
        assert_eq!(session.steps[0].pitches, vec![60, 64]);
        assert_eq!(session.steps[1].pitches, vec![67]);
        assert!(session.analysis.is_none());
    }

    #[test]
    fn test_analysis_loaded_from_default_path() {
        let dir = tempfile::tempdir().unwrap();
        let score_path = dir.path().join("piece.json");
        std::fs::write(&score_path, SCORE_JSON).unwrap();
        std::fs::write(
            dir.path().join("piece.analysis.json"),
            r#"[{"primary": "I", "secondary": "T"}]"#,
        )
        .unwrap();

        let options =
            ViewerOptions::from_query(&format!("score={}", score_path.display())).unwrap();
        let session = ViewerSession::load(&options).unwrap();

        let analysis = session.analysis.unwrap();
        assert_eq!(analysis.entry_for(1).unwrap().primary, "I");
    }

    #[test]
    fn test_missing_score_is_terminal() {
        let options = ViewerOptions::from_query("score=/nonexistent/piece.json").unwrap();
        assert!(ViewerSession::load(&options).is_err());
    }
}
