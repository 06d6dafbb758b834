//! Page structure extraction.
//!
//! The extraction itself happens in the browser: an opaque JavaScript
//! snippet runs via `Runtime.evaluate` and returns a JSON object that maps
//! onto [`PageStructure`]. The snippet is configuration data — the Rust side
//! only ships it and parses the result.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SessionError;

/// Structural overview of a rendered page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageStructure {
    #[serde(default)]
    pub page_id: String,
    pub url: String,
    pub title: String,
    pub structure: StructureDetail,
}

/// The extracted structure elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureDetail {
    pub classes: Vec<String>,
    pub ids: Vec<String>,
    pub headings: HashMap<String, Vec<String>>,
    pub interactive: InteractiveSummary,
    pub semantic_sections: Vec<SemanticSection>,
    pub data_attributes: Vec<String>,
    pub text_snippets: Vec<String>,
}

/// Interactive element summaries, grouped by leading class name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveSummary {
    pub buttons: Vec<String>,
    pub links: Vec<String>,
    pub forms: Vec<String>,
}

/// One group of semantic HTML sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticSection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub count: usize,
    #[serde(default)]
    pub children: Vec<String>,
}

/// Parse the analyzer's evaluation result into a typed structure.
pub(crate) fn parse_structure(page_id: &str, value: Value) -> Result<PageStructure, SessionError> {
    let mut structure: PageStructure =
        serde_json::from_value(value).map_err(|err| SessionError::Analysis(err.to_string()))?;
    // The snippet cannot know the target id; stamp it on here.
    structure.page_id = page_id.to_string();
    Ok(structure)
}

/// JavaScript that walks the DOM and summarizes its structure. Returns an
/// object shaped like [`PageStructure`] minus `page_id`.
pub(crate) const PAGE_ANALYZER_JS: &str = r#"(function() {
  var result = {
    url: location.href,
    title: document.title,
    structure: {
      classes: [],
      ids: [],
      headings: {},
      interactive: { buttons: [], links: [], forms: [] },
      semantic_sections: [],
      data_attributes: [],
      text_snippets: []
    }
  };

  var classSet = {};
  document.querySelectorAll('[class]').forEach(function(el) {
    el.classList.forEach(function(c) { classSet[c] = true; });
  });
  result.structure.classes = Object.keys(classSet).sort().map(function(c) { return '.' + c; });

  var ids = [];
  document.querySelectorAll('[id]').forEach(function(el) {
    ids.push('#' + el.id);
  });
  result.structure.ids = ids;

  ['h1','h2','h3','h4','h5','h6'].forEach(function(tag) {
    var els = document.querySelectorAll(tag);
    if (els.length > 0) {
      result.structure.headings[tag] = Array.from(els).map(function(el) {
        return el.textContent.trim().substring(0, 100);
      });
    }
  });

  var btnMap = {};
  document.querySelectorAll('button, [role="button"], input[type="button"], input[type="submit"]').forEach(function(el) {
    var key = el.className ? '.' + el.className.split(/\s+/)[0] : el.tagName.toLowerCase();
    btnMap[key] = (btnMap[key] || 0) + 1;
  });
  result.structure.interactive.buttons = Object.keys(btnMap).map(function(k) {
    return k + ' (' + btnMap[k] + ')';
  });

  var linkMap = {};
  document.querySelectorAll('a[href]').forEach(function(el) {
    var key = el.className ? '.' + el.className.split(/\s+/)[0] : 'a';
    linkMap[key] = (linkMap[key] || 0) + 1;
  });
  result.structure.interactive.links = Object.keys(linkMap).map(function(k) {
    return k + ' (' + linkMap[k] + ')';
  });

  var formMap = {};
  document.querySelectorAll('form').forEach(function(el) {
    var key = el.className ? '.' + el.className.split(/\s+/)[0] : 'form';
    var inputs = el.querySelectorAll('input, select, textarea').length;
    formMap[key] = { count: (formMap[key] ? formMap[key].count : 0) + 1, inputs: inputs };
  });
  result.structure.interactive.forms = Object.keys(formMap).map(function(k) {
    return k + ' (' + formMap[k].count + ', ' + formMap[k].inputs + ' inputs)';
  });

  ['article','nav','section','main','aside','header','footer'].forEach(function(tag) {
    var els = document.querySelectorAll(tag);
    if (els.length === 0) return;

    var groups = {};
    els.forEach(function(el) {
      var cls = el.className ? el.className.split(/\s+/)[0] : '';
      var key = cls || '_noclass';
      if (!groups[key]) {
        groups[key] = { count: 0, childTags: {} };
      }
      groups[key].count++;
      if (groups[key].count === 1) {
        Array.from(el.children).forEach(function(child) {
          var childKey = child.tagName.toLowerCase();
          if (child.className) childKey += '.' + child.className.split(/\s+/)[0];
          groups[key].childTags[childKey] = true;
        });
      }
    });

    Object.keys(groups).forEach(function(cls) {
      var g = groups[cls];
      var section = {
        type: tag,
        count: g.count,
        children: Object.keys(g.childTags).slice(0, 10)
      };
      if (cls !== '_noclass') section['class'] = cls;
      result.structure.semantic_sections.push(section);
    });
  });

  var dataAttrSet = {};
  document.querySelectorAll('*').forEach(function(el) {
    Array.from(el.attributes).forEach(function(attr) {
      if (attr.name.indexOf('data-') === 0) {
        dataAttrSet[attr.name] = true;
      }
    });
  });
  result.structure.data_attributes = Object.keys(dataAttrSet).sort();

  var snippets = [];
  document.querySelectorAll('p, li, td, h1, h2, h3, blockquote').forEach(function(el) {
    var text = el.textContent.trim();
    if (text.length > 10 && snippets.length < 20) {
      snippets.push(text.substring(0, 50));
    }
  });
  result.structure.text_snippets = snippets;

  return result;
})();"#;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_analyzer_output() {
        let raw = json!({
            "url": "https://example.com/",
            "title": "Example Domain",
            "structure": {
                "classes": [".hero", ".nav-item"],
                "ids": ["#main"],
                "headings": { "h1": ["Example Domain"] },
                "interactive": {
                    "buttons": [".cta (2)"],
                    "links": ["a (5)"],
                    "forms": []
                },
                "semantic_sections": [
                    { "type": "nav", "class": "top", "count": 1, "children": ["a.nav-item"] },
                    { "type": "main", "count": 1 }
                ],
                "data_attributes": ["data-test"],
                "text_snippets": ["This domain is for use in illustrative"]
            }
        });

        let parsed = parse_structure("TARGET-1", raw).unwrap();
        assert_eq!(parsed.page_id, "TARGET-1");
        assert_eq!(parsed.title, "Example Domain");
        assert_eq!(parsed.structure.classes.len(), 2);
        assert_eq!(parsed.structure.headings["h1"], vec!["Example Domain"]);
        assert_eq!(parsed.structure.semantic_sections[0].kind, "nav");
        assert_eq!(parsed.structure.semantic_sections[0].class.as_deref(), Some("top"));
        assert!(parsed.structure.semantic_sections[1].class.is_none());
    }

    #[test]
    fn malformed_output_is_an_analysis_error() {
        let err = parse_structure("T", json!({"url": "x"})).unwrap_err();
        assert!(matches!(err, SessionError::Analysis(_)));
    }

    #[test]
    fn structure_round_trips_through_serde() {
        let structure = PageStructure {
            page_id: "P".into(),
            url: "https://example.com".into(),
            title: "t".into(),
            structure: StructureDetail {
                classes: vec![".a".into()],
                ids: vec![],
                headings: HashMap::new(),
                interactive: InteractiveSummary {
                    buttons: vec![],
                    links: vec![],
                    forms: vec![],
                },
                semantic_sections: vec![],
                data_attributes: vec![],
                text_snippets: vec![],
            },
        };

        let value = serde_json::to_value(&structure).unwrap();
        assert_eq!(value["page_id"], "P");
        let back: PageStructure = serde_json::from_value(value).unwrap();
        assert_eq!(back.structure.classes, vec![".a"]);
    }
}
