pub mod config;
pub mod frequency;
pub mod pipeline;
pub mod speakers;
pub mod tagger;
pub mod template;
pub mod tokenize;
pub mod treebank;
pub mod vocabulary;
