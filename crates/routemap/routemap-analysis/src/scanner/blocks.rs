//! Lexical block tree over the token stream.
//!
//! Blocks live in an arena and refer to their parent by id. Block 0 is the
//! whole file. An opener token belongs to the enclosing block; everything up
//! to and excluding the matching closer belongs to the new one.

use routemap_core::types::collections::FxHashMap;

use super::token::{Token, TokenKind};
use crate::profiles::BlockSyntax;

pub type BlockId = usize;

pub const ROOT_BLOCK: BlockId = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    pub parent: Option<BlockId>,
    /// Token index of the opener, `None` for the root.
    pub open: Option<usize>,
    /// Token index of the closer, `None` when unclosed.
    pub close: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct BlockTree {
    blocks: Vec<Block>,
    enclosing: Vec<BlockId>,
    opened_by: FxHashMap<usize, BlockId>,
}

impl BlockTree {
    pub fn build(tokens: &[Token], text: &str, syntax: &BlockSyntax) -> Self {
        let mut blocks = vec![Block {
            id: ROOT_BLOCK,
            parent: None,
            open: None,
            close: None,
        }];
        let mut enclosing = Vec::with_capacity(tokens.len());
        let mut opened_by = FxHashMap::default();
        let mut stack = vec![ROOT_BLOCK];
        // Line of the last keyword that opened a block at statement start;
        // a `do` on that same line continues it rather than opening another.
        let mut line_opener: Option<u32> = None;

        for (i, token) in tokens.iter().enumerate() {
            let top = stack.last().copied().unwrap_or(ROOT_BLOCK);
            let opens = match &token.kind {
                TokenKind::Punct('{') => syntax.braces,
                TokenKind::Word => {
                    let word = token.text(text);
                    if syntax.line_open_keywords.iter().any(|k| k == word)
                        && starts_statement(tokens, i)
                    {
                        line_opener = Some(token.line);
                        true
                    } else if syntax.open_keywords.iter().any(|k| k == word) {
                        line_opener != Some(token.line)
                    } else {
                        false
                    }
                }
                _ => false,
            };
            let closes = match &token.kind {
                TokenKind::Punct('}') => syntax.braces,
                TokenKind::Word => syntax.close_keywords.iter().any(|k| k == token.text(text)),
                _ => false,
            };

            if opens {
                let id = blocks.len();
                blocks.push(Block {
                    id,
                    parent: Some(top),
                    open: Some(i),
                    close: None,
                });
                opened_by.insert(i, id);
                enclosing.push(top);
                stack.push(id);
            } else if closes && stack.len() > 1 {
                if let Some(done) = stack.pop() {
                    blocks[done].close = Some(i);
                }
                enclosing.push(stack.last().copied().unwrap_or(ROOT_BLOCK));
            } else {
                enclosing.push(top);
            }
        }

        Self {
            blocks,
            enclosing,
            opened_by,
        }
    }

    /// Innermost block containing token `index`. Out-of-range indices are
    /// treated as file level.
    pub fn enclosing(&self, index: usize) -> BlockId {
        self.enclosing.get(index).copied().unwrap_or(ROOT_BLOCK)
    }

    pub fn opened_at(&self, index: usize) -> Option<BlockId> {
        self.opened_by.get(&index).copied()
    }

    pub fn get(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }

    pub fn parent(&self, id: BlockId) -> Option<BlockId> {
        self.blocks.get(id).and_then(|b| b.parent)
    }

    /// `id`, its parent, and so on up to the root.
    pub fn ancestors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        std::iter::successors(Some(id), move |&b| self.parent(b))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.len() <= 1
    }
}

fn starts_statement(tokens: &[Token], i: usize) -> bool {
    if i == 0 || tokens[i].newline_before {
        return true;
    }
    matches!(tokens[i - 1].kind, TokenKind::Punct(';' | '=' | '('))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::{LexicalClassifier, LineIndex};
    use crate::profiles::LexicalSyntax;
    use crate::scanner::token::Tokenizer;

    fn build(text: &str, syntax: &BlockSyntax) -> (Vec<Token>, BlockTree) {
        let lexical = LexicalSyntax::default();
        let lines = LineIndex::new(text);
        let c = LexicalClassifier::new(&lexical).classify(text, &lines);
        let tokens = Tokenizer::new(&lexical).tokenize(text, &c, &lines);
        let tree = BlockTree::build(&tokens, text, syntax);
        (tokens, tree)
    }

    fn index_of(tokens: &[Token], text: &str, word: &str) -> usize {
        tokens.iter().position(|t| t.text(text) == word).unwrap()
    }

    #[test]
    fn test_brace_nesting() {
        let text = "a { b { c } d } e";
        let (tokens, tree) = build(text, &BlockSyntax::default());
        assert_eq!(tree.len(), 3);
        let a = index_of(&tokens, text, "a");
        let b = index_of(&tokens, text, "b");
        let c = index_of(&tokens, text, "c");
        let d = index_of(&tokens, text, "d");
        let e = index_of(&tokens, text, "e");
        assert_eq!(tree.enclosing(a), ROOT_BLOCK);
        assert_eq!(tree.enclosing(b), 1);
        assert_eq!(tree.enclosing(c), 2);
        assert_eq!(tree.enclosing(d), 1);
        assert_eq!(tree.enclosing(e), ROOT_BLOCK);
        assert_eq!(tree.ancestors(2).collect::<Vec<_>>(), vec![2, 1, 0]);
        assert_eq!(tree.opened_at(1), Some(1));
    }

    #[test]
    fn test_keyword_blocks() {
        let syntax = BlockSyntax {
            braces: true,
            open_keywords: vec!["do".into(), "def".into()],
            line_open_keywords: vec!["if".into(), "while".into()],
            close_keywords: vec!["end".into()],
        };
        let text = "scope do\n  x if y\n  while z do\n  w\n  end\n  v\nend\nu";
        let (tokens, tree) = build(text, &syntax);
        let v = index_of(&tokens, text, "v");
        let w = index_of(&tokens, text, "w");
        let u = index_of(&tokens, text, "u");
        assert_eq!(tree.enclosing(v), 1);
        assert_eq!(tree.enclosing(w), 2);
        assert_eq!(tree.enclosing(u), ROOT_BLOCK);
    }

    #[test]
    fn test_stray_closer_is_ignored() {
        let (tokens, tree) = build("} a", &BlockSyntax::default());
        assert_eq!(tree.enclosing(tokens.len() - 1), ROOT_BLOCK);
        assert!(tree.is_empty());
    }
}
