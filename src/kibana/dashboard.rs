//! Dashboard saved objects

use serde_json::{Value, json};

/// Panel schema version written into `panelsJSON`
const PANEL_VERSION: &str = "8.8.0";

/// Grid position of a panel (Kibana grids are 48 columns wide)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelLayout {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl PanelLayout {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

#[derive(Debug, Clone)]
struct Panel {
    visualization_id: String,
    layout: PanelLayout,
    title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub id: String,
    pub title: String,
    pub description: String,
    panels: Vec<Panel>,
    time_range: Option<(String, String)>,
}

impl Dashboard {
    pub fn new(id: &str, title: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            panels: Vec::new(),
            time_range: None,
        }
    }

    /// Build from a layout table of `(visualization id, position)`
    pub fn with_layout(mut self, layout: &[(&str, PanelLayout)]) -> Self {
        for (id, position) in layout {
            self = self.panel(id, *position);
        }
        self
    }

    pub fn panel(mut self, visualization_id: &str, layout: PanelLayout) -> Self {
        self.panels.push(Panel {
            visualization_id: visualization_id.to_string(),
            layout,
            title: None,
        });
        self
    }

    /// Panel with a title that overrides the visualization's own
    pub fn titled_panel(mut self, visualization_id: &str, layout: PanelLayout, title: &str) -> Self {
        self.panels.push(Panel {
            visualization_id: visualization_id.to_string(),
            layout,
            title: Some(title.to_string()),
        });
        self
    }

    /// Store a time range with the dashboard (e.g. `now-30d`..`now+7d`)
    pub fn time_range(mut self, from: &str, to: &str) -> Self {
        self.time_range = Some((from.to_string(), to.to_string()));
        self
    }

    pub fn visualization_ids(&self) -> impl Iterator<Item = &str> {
        self.panels.iter().map(|p| p.visualization_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// Saved-object body; panel `N` references `panel_N`
    pub fn to_saved_object(&self) -> Value {
        let mut panels = Vec::with_capacity(self.panels.len());
        let mut references = Vec::with_capacity(self.panels.len());

        for (idx, panel) in self.panels.iter().enumerate() {
            let index = (idx + 1).to_string();
            let mut embeddable = json!({"enhancements": {}});
            if let Some(title) = &panel.title {
                embeddable["title"] = json!(title);
            }
            panels.push(json!({
                "version": PANEL_VERSION,
                "type": "lens",
                "gridData": {
                    "x": panel.layout.x,
                    "y": panel.layout.y,
                    "w": panel.layout.w,
                    "h": panel.layout.h,
                    "i": index
                },
                "panelIndex": index,
                "embeddableConfig": embeddable,
                "panelRefName": format!("panel_{}", index)
            }));
            references.push(json!({
                "name": format!("panel_{}", index),
                "type": "lens",
                "id": panel.visualization_id
            }));
        }

        let mut attributes = json!({
            "title": self.title,
            "description": self.description,
            "panelsJSON": Value::Array(panels).to_string(),
            "optionsJSON": json!({
                "useMargins": true,
                "syncColors": false,
                "hidePanelTitles": false
            }).to_string(),
            "version": 1,
            "timeRestore": self.time_range.is_some(),
            "kibanaSavedObjectMeta": {
                "searchSourceJSON": json!({
                    "query": {"query": "", "language": "kuery"},
                    "filter": []
                }).to_string()
            }
        });
        if let Some((from, to)) = &self.time_range {
            attributes["timeFrom"] = json!(from);
            attributes["timeTo"] = json!(to);
        }

        json!({"attributes": attributes, "references": references})
    }
}
