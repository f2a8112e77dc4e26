pub mod chat_turn;
