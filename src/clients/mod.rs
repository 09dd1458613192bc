pub mod litellm;
