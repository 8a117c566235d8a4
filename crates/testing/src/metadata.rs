use serde_json::{Map, Value, json};

/// Builder for a version 2 `metadata.json` with a single analyzer run
#[derive(Debug, Clone)]
pub struct MetadataFixture {
    name: String,
    reports: Vec<(String, String)>,
    analyzers: Vec<String>,
    timestamps: (f64, f64),
    action_num: u64,
    skipped: u64,
}

impl MetadataFixture {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reports: Vec::new(),
            analyzers: Vec::new(),
            timestamps: (1_600_000_000.0, 1_600_000_010.0),
            action_num: 0,
            skipped: 0,
        }
    }

    /// Declares that `report` was produced for `source`
    pub fn report(mut self, report: &str, source: &str) -> Self {
        self.reports.push((report.to_string(), source.to_string()));
        self.action_num += 1;
        self
    }

    pub fn analyzer(mut self, name: &str) -> Self {
        self.analyzers.push(name.to_string());
        self
    }

    pub fn timestamps(mut self, begin: f64, end: f64) -> Self {
        self.timestamps = (begin, end);
        self
    }

    pub fn skipped(mut self, skipped: u64) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn to_json(&self) -> String {
        let result_source_files: Map<String, Value> = self
            .reports
            .iter()
            .map(|(report, source)| (report.clone(), Value::String(source.clone())))
            .collect();

        let analyzers: Map<String, Value> = self
            .analyzers
            .iter()
            .map(|name| {
                (
                    name.clone(),
                    json!({
                        "checkers": {},
                        "analyzer_statistics": {
                            "version": "test",
                            "failed": 0,
                            "failed_sources": [],
                            "successful": self.reports.len(),
                            "successful_sources": [],
                        }
                    }),
                )
            })
            .collect();

        let document = json!({
            "version": 2,
            "tools": [{
                "name": self.name,
                "timestamps": { "begin": self.timestamps.0, "end": self.timestamps.1 },
                "command": ["CodeChecker", "analyze", "compile_commands.json"],
                "version": "6.23.0",
                "working_directory": "/work",
                "output_path": "/work/codechecker",
                "result_source_files": result_source_files,
                "analyzers": analyzers,
                "action_num": self.action_num,
                "skipped": self.skipped,
            }]
        });

        serde_json::to_string_pretty(&document).expect("metadata serializes")
    }
}
