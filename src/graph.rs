//! 카테고리 의존 그래프
//!
//! 매처의 category → groups leaf 를 간선으로 하는 방향 그래프를 만들고,
//! 순환에 속한 간선을 빨간색으로 표시한 DOT/SVG 를 그린다.
//! 그래프는 내보낼 때마다 새로 만들며 저장하지 않는다.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::PackError;
use crate::models::flatten_groups;
use crate::payload::SerializedMatcher;

/// 순환 간선 색
pub const CYCLE_COLOR: &str = "red";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    pub name: String,
    /// 이 카테고리를 주 카테고리로 가진 매처 수
    pub rule_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEdge {
    pub from: String,
    pub to: String,
    pub cyclic: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryGraph {
    pub nodes: Vec<CategoryNode>,
    pub edges: Vec<CategoryEdge>,
}

impl CategoryGraph {
    /// 직렬화된 매처 목록으로 그래프 구성
    pub fn build(matchers: &[SerializedMatcher]) -> Self {
        let mut node_index: HashMap<String, usize> = HashMap::new();
        let mut nodes: Vec<CategoryNode> = Vec::new();
        let mut seen_edges: HashSet<(String, String)> = HashSet::new();
        let mut edge_pairs: Vec<(String, String)> = Vec::new();

        let mut touch = |name: &str, nodes: &mut Vec<CategoryNode>| -> usize {
            *node_index.entry(name.to_string()).or_insert_with(|| {
                nodes.push(CategoryNode {
                    name: name.to_string(),
                    rule_count: 0,
                });
                nodes.len() - 1
            })
        };

        for m in matchers {
            let idx = touch(&m.category, &mut nodes);
            nodes[idx].rule_count += 1;

            for leaf in flatten_groups(&m.groups) {
                touch(leaf, &mut nodes);
                let pair = (m.category.clone(), leaf.to_string());
                if seen_edges.insert(pair.clone()) {
                    edge_pairs.push(pair);
                }
            }
        }

        let edges = classify_edges(&edge_pairs);
        CategoryGraph { nodes, edges }
    }

    pub fn cyclic_edges(&self) -> impl Iterator<Item = &CategoryEdge> {
        self.edges.iter().filter(|e| e.cyclic)
    }

    /// Graphviz DOT 텍스트. 노드마다 카테고리 필터 링크를 붙인다
    pub fn to_dot(&self, link: &dyn Fn(&str) -> String) -> String {
        let mut out = String::new();
        out.push_str("digraph categories {\n");
        out.push_str("  rankdir=LR;\n");
        out.push_str("  node [shape=box, style=rounded, fontname=\"Helvetica\"];\n");

        for node in &self.nodes {
            out.push_str(&format!(
                "  {} [label={}, URL={}, target=\"_blank\"];\n",
                dot_quote(&node.name),
                dot_quote(&format!("{} ({})", node.name, node.rule_count)),
                dot_quote(&link(&node.name)),
            ));
        }

        for edge in &self.edges {
            let attrs = if edge.cyclic {
                format!(" [color={}]", CYCLE_COLOR)
            } else {
                String::new()
            };
            out.push_str(&format!(
                "  {} -> {}{};\n",
                dot_quote(&edge.from),
                dot_quote(&edge.to),
                attrs
            ));
        }

        out.push_str("}\n");
        out
    }
}

/// 간선마다 독립적으로 순환 여부 판정.
/// (u, v) 는 u == v 이거나, v 에서 시작한 DFS 가 (from, to) 쌍을 한 번씩만 밟으면서 u 에 닿으면 순환
pub fn classify_edges(pairs: &[(String, String)]) -> Vec<CategoryEdge> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for (from, to) in pairs {
        adjacency.entry(from.as_str()).or_default().push(to.as_str());
    }

    pairs
        .iter()
        .map(|(u, v)| CategoryEdge {
            from: u.clone(),
            to: v.clone(),
            cyclic: u == v || reaches(&adjacency, v, u),
        })
        .collect()
}

fn reaches(adjacency: &HashMap<&str, Vec<&str>>, start: &str, target: &str) -> bool {
    let mut visited: HashSet<(&str, &str)> = HashSet::new();
    let mut stack: Vec<&str> = vec![start];

    while let Some(node) = stack.pop() {
        if node == target {
            return true;
        }
        if let Some(nexts) = adjacency.get(node) {
            for &next in nexts {
                if visited.insert((node, next)) {
                    stack.push(next);
                }
            }
        }
    }
    false
}

/// DOT 문자열 리터럴
fn dot_quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
    format!("\"{}\"", escaped)
}

/// DOT → 파일. 저장 위치 정책은 호출자가 결정
pub trait GraphRenderer: Send + Sync {
    /// 출력 파일 확장자 (latest.<ext>)
    fn extension(&self) -> &str;

    fn render(&self, dot: &str, out_path: &Path) -> Result<(), PackError>;
}

/// Graphviz `dot` 바이너리로 SVG 생성
#[derive(Debug, Clone)]
pub struct GraphvizRenderer {
    pub dot_bin: PathBuf,
}

impl GraphvizRenderer {
    pub fn new(dot_bin: impl Into<PathBuf>) -> Self {
        Self {
            dot_bin: dot_bin.into(),
        }
    }
}

impl GraphRenderer for GraphvizRenderer {
    fn extension(&self) -> &str {
        "svg"
    }

    fn render(&self, dot: &str, out_path: &Path) -> Result<(), PackError> {
        debug!(bin = %self.dot_bin.display(), out = %out_path.display(), "running graphviz");

        let mut child = Command::new(&self.dot_bin)
            .arg("-Tsvg")
            .arg("-o")
            .arg(out_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PackError::Render(format!("failed to start {}: {}", self.dot_bin.display(), e))
            })?;

        // 쓰기가 실패해도 프로세스는 반드시 회수한다 (stdin 은 블록 끝에서 닫힘)
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(dot.as_bytes()),
            None => Ok(()),
        };

        let output = child.wait_with_output()?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if let Err(e) = written {
            return Err(PackError::Render(format!(
                "failed to write to {} ({}): {}",
                self.dot_bin.display(),
                e,
                stderr.trim()
            )));
        }
        if !output.status.success() {
            return Err(PackError::Render(format!(
                "dot exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Graphviz 가 없는 환경용: DOT 텍스트를 그대로 저장
#[derive(Debug, Clone, Default)]
pub struct DotSourceRenderer;

impl GraphRenderer for DotSourceRenderer {
    fn extension(&self) -> &str {
        "dot"
    }

    fn render(&self, dot: &str, out_path: &Path) -> Result<(), PackError> {
        std::fs::write(out_path, dot)?;
        Ok(())
    }
}
