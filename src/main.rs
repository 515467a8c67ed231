use gen_2048::engine::{Board, GameConfig};
use gen_2048::expectimax::Expectimax;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let mut expectimax = Expectimax::new();
    let mut rng = rand::thread_rng();
    let mut board = Board::new(GameConfig::default(), &mut rng)?;
    println!("{}", board);
    let mut move_count = 0;
    let mut total_states: u64 = 0;
    while !board.game_over() {
        let action = expectimax.best_action(&board, &mut rng)?;
        move_count += 1;
        board.apply(action, &mut rng);
        println!("{action}\n{}", board);
        total_states = total_states.saturating_add(expectimax.last_stats().nodes);
    }
    println!(
        "Moves made: {}, Score: {}, Max tile: {}, States considered: {}, Max states considered for a move: {}",
        move_count,
        board.score(),
        board.max_tile(),
        total_states,
        expectimax.last_stats().peak_nodes
    );
    Ok(())
}
