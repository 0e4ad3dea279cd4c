mod lint_files;
mod reporting;
mod settings;
